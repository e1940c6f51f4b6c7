//! RegisterService: add a service providers may bond against.

use shared_types::AccAddress;
use tracing::info;

use crate::domain::entities::ServiceRecord;
use crate::domain::errors::EngineError;
use crate::domain::messages::MsgRegisterService;
use crate::events::Event;
use crate::store::{tables, Ctx};

pub fn validate(ctx: &Ctx<'_>, signer: &AccAddress, msg: &MsgRegisterService) -> Result<(), EngineError> {
    super::require_authority(ctx, signer)?;
    if tables::get_service(ctx.store(), &msg.name)?.is_some() {
        return Err(EngineError::ServiceNameTaken(msg.name.to_string()));
    }
    if tables::get_service_by_id(ctx.store(), msg.id)?.is_some() {
        return Err(EngineError::ServiceIdTaken(msg.id));
    }
    Ok(())
}

pub fn handle(ctx: &mut Ctx<'_>, msg: &MsgRegisterService) -> Result<(), EngineError> {
    let record = ServiceRecord::from(msg);
    tables::set_service(ctx.store_mut(), &record)?;
    info!(service = %record.name, id = record.id, "service registered");
    ctx.emit(Event::register_service(&record));
    Ok(())
}
