//! # Message Handlers
//!
//! Every message runs validate-then-apply:
//!
//! 1. stateless checks ([`SignedMsg::validate_basic`])
//! 2. stateful checks against the current state (read-only)
//! 3. apply inside [`Ctx::with_cache`], merged only on success
//!
//! A rejected message leaves no writes, no transfers and no events behind.

pub mod bond_provider;
pub mod claim_income;
pub mod close_contract;
pub mod mod_provider;
pub mod open_contract;
pub mod register_service;
pub mod remove_service;
pub mod set_version;
pub mod update_service;

use shared_types::{AccAddress, Service};
use tracing::{error, info, warn};

use crate::domain::errors::EngineError;
use crate::domain::messages::{Msg, SignedMsg};
use crate::store::{tables, Ctx};

/// Validate and apply one signed message.
pub fn dispatch(ctx: &mut Ctx<'_>, tx: &SignedMsg) -> Result<(), EngineError> {
    let msg_type = tx.msg.type_name();
    info!(msg_type, signer = %tx.signer, height = ctx.height(), "received message");

    if let Err(err) = tx.validate_basic(ctx.config()) {
        warn!(msg_type, error = %err, "message failed stateless validation");
        return Err(err);
    }

    let signer = &tx.signer;
    match &tx.msg {
        Msg::BondProvider(msg) => {
            bond_provider::validate(ctx, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| bond_provider::handle(scratch, signer, msg)))
        }
        Msg::ModProvider(msg) => {
            mod_provider::validate(ctx, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| mod_provider::handle(scratch, msg)))
        }
        Msg::OpenContract(msg) => {
            open_contract::validate(ctx, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| open_contract::handle(scratch, signer, msg)))
        }
        Msg::CloseContract(msg) => {
            let contract =
                close_contract::validate(ctx, signer, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| close_contract::handle(scratch, contract)))
        }
        Msg::ClaimContractIncome(msg) => {
            let contract = claim_income::validate(ctx, msg).map_err(|e| rejected(msg_type, e))?;
            applied(
                msg_type,
                ctx.with_cache(|scratch| claim_income::handle(scratch, contract, msg)),
            )
        }
        Msg::SetVersion(msg) => {
            set_version::validate(ctx, signer, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| set_version::handle(scratch, signer, msg)))
        }
        Msg::RegisterService(msg) => {
            register_service::validate(ctx, signer, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| register_service::handle(scratch, msg)))
        }
        Msg::UpdateService(msg) => {
            update_service::validate(ctx, signer, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| update_service::handle(scratch, msg)))
        }
        Msg::RemoveService(msg) => {
            remove_service::validate(ctx, signer, msg).map_err(|e| rejected(msg_type, e))?;
            applied(msg_type, ctx.with_cache(|scratch| remove_service::handle(scratch, msg)))
        }
    }
}

/// Registry changes are limited to the configured authorities.
fn require_authority(ctx: &Ctx<'_>, signer: &AccAddress) -> Result<(), EngineError> {
    if !ctx.config().is_service_authority(signer) {
        return Err(EngineError::Unauthorized(*signer));
    }
    Ok(())
}

/// Providers and contracts only attach to registered services.
fn require_registered(ctx: &Ctx<'_>, service: &Service) -> Result<(), EngineError> {
    if tables::get_service(ctx.store(), service)?.is_none() {
        return Err(EngineError::ServiceNotFound(service.to_string()));
    }
    Ok(())
}

fn rejected(msg_type: &'static str, err: EngineError) -> EngineError {
    warn!(msg_type, error = %err, "message rejected");
    err
}

fn applied(msg_type: &'static str, result: Result<(), EngineError>) -> Result<(), EngineError> {
    if let Err(err) = &result {
        error!(msg_type, error = %err, "message failed to apply, changes discarded");
    }
    result
}
