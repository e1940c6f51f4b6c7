//! SetVersion: a validator announces the software version it runs.

use shared_types::AccAddress;

use crate::domain::errors::EngineError;
use crate::domain::messages::MsgSetVersion;
use crate::events::Event;
use crate::store::{tables, Ctx};

pub fn validate(ctx: &Ctx<'_>, signer: &AccAddress, msg: &MsgSetVersion) -> Result<(), EngineError> {
    if ctx.config().handlers.set_version_disabled {
        return Err(EngineError::DisabledHandler("set_version"));
    }
    let current = tables::get_validator_version(ctx.store(), signer)?;
    if msg.version <= current {
        return Err(EngineError::VersionNotIncreasing {
            current,
            requested: msg.version,
        });
    }
    Ok(())
}

pub fn handle(ctx: &mut Ctx<'_>, signer: &AccAddress, msg: &MsgSetVersion) -> Result<(), EngineError> {
    tables::set_validator_version(ctx.store_mut(), signer, msg.version)?;
    ctx.emit(Event::set_version(signer, msg.version));
    Ok(())
}
