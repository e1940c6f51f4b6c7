//! UpdateService: replace the description and type of a registered service.

use shared_types::AccAddress;

use crate::domain::entities::ServiceRecord;
use crate::domain::errors::EngineError;
use crate::domain::messages::MsgUpdateService;
use crate::events::Event;
use crate::store::{tables, Ctx};

/// Name and id together identify the service; neither can be changed here.
pub fn validate(ctx: &Ctx<'_>, signer: &AccAddress, msg: &MsgUpdateService) -> Result<(), EngineError> {
    super::require_authority(ctx, signer)?;
    let existing = tables::get_service(ctx.store(), &msg.name)?
        .ok_or_else(|| EngineError::ServiceNotFound(msg.name.to_string()))?;
    if existing.id != msg.id {
        return Err(EngineError::ServiceIdMismatch {
            service: msg.name.to_string(),
            expected: existing.id,
            actual: msg.id,
        });
    }
    Ok(())
}

pub fn handle(ctx: &mut Ctx<'_>, msg: &MsgUpdateService) -> Result<(), EngineError> {
    let record = ServiceRecord::from(msg);
    tables::set_service(ctx.store_mut(), &record)?;
    ctx.emit(Event::update_service(&record));
    Ok(())
}
