//! CloseContract: end a contract early at the client's request.

use shared_crypto::derive_address;
use shared_types::AccAddress;
use tracing::info;

use crate::domain::entities::{Contract, ContractKind};
use crate::domain::errors::EngineError;
use crate::domain::messages::MsgCloseContract;
use crate::events::Event;
use crate::settlement::finalize;
use crate::store::{tables, Ctx};

pub fn validate(ctx: &Ctx<'_>, signer: &AccAddress, msg: &MsgCloseContract) -> Result<Contract, EngineError> {
    if ctx.config().handlers.close_contract_disabled {
        return Err(EngineError::DisabledHandler("close_contract"));
    }
    let contract = tables::get_contract(ctx.store(), msg.contract_id)?
        .ok_or(EngineError::ContractNotFound(msg.contract_id))?;

    if msg.client != contract.client || *signer != derive_address(&contract.client) {
        return Err(EngineError::CloseUnauthorized);
    }
    if contract.is_settled() || contract.is_closing() || ctx.height() > contract.expiration() {
        return Err(EngineError::CloseAlreadyClosed(contract.id));
    }
    if msg.delegate.is_some() && msg.delegate != contract.delegate {
        return Err(EngineError::DelegateMismatch(contract.id));
    }
    Ok(contract)
}

/// Subscriptions settle now. Pay-as-you-go contracts move into their
/// settlement window and are finalized by the sweep when it ends.
pub fn handle(ctx: &mut Ctx<'_>, contract: Contract) -> Result<(), EngineError> {
    let height = ctx.height();
    let closed = match contract.kind {
        ContractKind::PayAsYouGo if contract.settlement_duration > 0 => {
            let mut contract = contract;
            tables::remove_from_expiration(ctx.store_mut(), contract.due_height(), contract.id)?;
            contract.closed_height = height;
            tables::add_to_expiration(ctx.store_mut(), contract.due_height(), contract.id)?;
            tables::set_contract(ctx.store_mut(), &contract)?;
            info!(
                contract_id = contract.id,
                settles_at = contract.due_height(),
                "pay-as-you-go contract entered settlement window"
            );
            contract
        }
        _ => {
            let nonce = contract.nonce;
            finalize(ctx, contract, nonce, true)?
        }
    };
    ctx.emit(Event::close_contract(&closed));
    Ok(())
}
