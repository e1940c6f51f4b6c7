//! # Settlement Engine
//!
//! Applies a [`Settlement`](crate::domain::settlement::Settlement) to the
//! ledger and the contract tables. Shared by claims, closes and the
//! expiration sweep.

use shared_crypto::derive_address;
use shared_types::{Coin, Holder, ModuleAccount};
use tracing::{debug, info};

use crate::domain::entities::Contract;
use crate::domain::errors::EngineError;
use crate::domain::settlement::compute_settlement;
use crate::events::Event;
use crate::store::{tables, Ctx};

/// Settle `contract` at the current height with the claimed `nonce`.
///
/// Owed debt moves from escrow to the provider and the reserve. With
/// `is_final` the remainder of the deposit is refunded to the client, the
/// settlement height is stamped and the contract leaves both indexes.
/// Finalizing an already settled contract returns it unchanged.
pub fn finalize(
    ctx: &mut Ctx<'_>,
    mut contract: Contract,
    nonce: i64,
    is_final: bool,
) -> Result<Contract, EngineError> {
    if is_final && contract.is_settled() {
        debug!(
            contract_id = contract.id,
            settlement_height = contract.settlement_height,
            "contract already settled, skipping"
        );
        return Ok(contract);
    }

    let height = ctx.height();
    let settlement = compute_settlement(&contract, nonce, height, ctx.config().reserve_tax_bps);
    contract.nonce = settlement.nonce;

    let escrow = Holder::Module(ModuleAccount::ContractEscrow);
    let denom = contract.rate.denom.clone();

    if settlement.debt > 0 {
        if settlement.provider_share > 0 {
            let provider = Holder::Account(derive_address(&contract.provider));
            ctx.ledger_mut().transfer(
                &escrow,
                &provider,
                &Coin::new(denom.clone(), settlement.provider_share),
            )?;
        }
        if settlement.reserve_share > 0 {
            ctx.ledger_mut().transfer(
                &escrow,
                &Holder::Module(ModuleAccount::Reserve),
                &Coin::new(denom.clone(), settlement.reserve_share),
            )?;
        }
        contract.paid = contract
            .paid
            .checked_add(settlement.debt)
            .ok_or(EngineError::Overflow("contract paid"))?;
    }

    if is_final {
        let refund = contract.outstanding();
        if refund > 0 {
            let client = Holder::Account(derive_address(&contract.client));
            ctx.ledger_mut()
                .transfer(&escrow, &client, &Coin::new(denom, refund))?;
        }
        let due_height = contract.due_height();
        contract.deposit = contract.paid;
        contract.settlement_height = height;
        tables::remove_user_contract(ctx.store_mut(), &contract.spender(), contract.id)?;
        tables::remove_from_expiration(ctx.store_mut(), due_height, contract.id)?;
        info!(
            contract_id = contract.id,
            paid = contract.paid,
            refund,
            height,
            "contract finalized"
        );
    }

    tables::set_contract(ctx.store_mut(), &contract)?;
    ctx.emit(Event::contract_settlement(
        &contract,
        settlement.provider_share,
        settlement.reserve_share,
    ));
    Ok(contract)
}
