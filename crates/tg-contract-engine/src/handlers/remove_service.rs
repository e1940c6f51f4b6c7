//! RemoveService: drop a service from the registry.
//!
//! Existing providers and contracts are left alone; they can still withdraw
//! bond and settle, but nothing new can attach to the service.

use shared_types::AccAddress;
use tracing::info;

use crate::domain::errors::EngineError;
use crate::domain::messages::MsgRemoveService;
use crate::events::Event;
use crate::store::{tables, Ctx};

pub fn validate(ctx: &Ctx<'_>, signer: &AccAddress, msg: &MsgRemoveService) -> Result<(), EngineError> {
    super::require_authority(ctx, signer)?;
    super::require_registered(ctx, &msg.name)
}

pub fn handle(ctx: &mut Ctx<'_>, msg: &MsgRemoveService) -> Result<(), EngineError> {
    tables::remove_service(ctx.store_mut(), &msg.name)?;
    info!(service = %msg.name, "service removed");
    ctx.emit(Event::remove_service(&msg.name));
    Ok(())
}
