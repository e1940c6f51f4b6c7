//! ClaimContractIncome: settle accrued debt with a spender-signed nonce.

use crate::domain::entities::{Authorization, Contract, ContractKind};
use crate::domain::errors::EngineError;
use crate::domain::messages::MsgClaimContractIncome;
use crate::settlement::finalize;
use crate::store::{tables, Ctx};

pub fn validate(ctx: &Ctx<'_>, msg: &MsgClaimContractIncome) -> Result<Contract, EngineError> {
    if ctx.config().handlers.claim_contract_income_disabled {
        return Err(EngineError::DisabledHandler("claim_contract_income"));
    }
    let contract = tables::get_contract(ctx.store(), msg.contract_id)?
        .ok_or(EngineError::ContractNotFound(msg.contract_id))?;

    if msg.nonce <= contract.nonce {
        return Err(EngineError::BadNonce {
            stored: contract.nonce,
            received: msg.nonce,
        });
    }
    if contract.is_settled() || contract.paid >= contract.deposit {
        return Err(EngineError::ContractClosed(contract.id));
    }
    if msg.signature_expires_at_block < ctx.height() {
        return Err(EngineError::SignatureExpired {
            expires_at: msg.signature_expires_at_block,
            height: ctx.height(),
        });
    }
    if msg.chain_id != ctx.chain_id() {
        return Err(EngineError::ChainIdMismatch {
            expected: ctx.chain_id().to_string(),
            actual: msg.chain_id.clone(),
        });
    }

    let open_subscription = contract.kind == ContractKind::Subscription
        && contract.authorization == Authorization::Open;
    if !open_subscription
        && !ctx
            .verifier()
            .verify(&contract.spender(), &msg.sign_bytes(), &msg.signature)
    {
        return Err(EngineError::InvalidSignature);
    }
    Ok(contract)
}

pub fn handle(ctx: &mut Ctx<'_>, contract: Contract, msg: &MsgClaimContractIncome) -> Result<(), EngineError> {
    finalize(ctx, contract, msg.nonce, false)?;
    Ok(())
}
