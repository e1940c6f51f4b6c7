//! ModProvider: replace a bonded provider's published terms.

use tracing::debug;

use crate::domain::errors::EngineError;
use crate::domain::messages::MsgModProvider;
use crate::events::Event;
use crate::store::{tables, Ctx};

pub fn validate(ctx: &Ctx<'_>, msg: &MsgModProvider) -> Result<(), EngineError> {
    let config = ctx.config();
    if config.handlers.mod_provider_disabled {
        return Err(EngineError::DisabledHandler("mod_provider"));
    }
    super::require_registered(ctx, &msg.service)?;
    for duration in [msg.min_contract_duration, msg.max_contract_duration] {
        if duration > config.max_contract_length {
            return Err(EngineError::ContractDuration {
                duration,
                min: 1,
                max: config.max_contract_length,
            });
        }
    }
    let bonded = tables::get_provider(ctx.store(), &msg.provider, &msg.service)?
        .is_some_and(|p| p.bond > 0);
    if !bonded {
        return Err(EngineError::ProviderNotFound {
            provider: msg.provider.to_string(),
            service: msg.service.to_string(),
        });
    }
    Ok(())
}

/// Terms are replaced wholesale. The metadata nonce only moves forward.
pub fn handle(ctx: &mut Ctx<'_>, msg: &MsgModProvider) -> Result<(), EngineError> {
    let mut provider = tables::get_provider(ctx.store(), &msg.provider, &msg.service)?.ok_or_else(
        || EngineError::ProviderNotFound {
            provider: msg.provider.to_string(),
            service: msg.service.to_string(),
        },
    )?;

    provider.metadata_uri = msg.metadata_uri.clone();
    if msg.metadata_nonce > provider.metadata_nonce {
        provider.metadata_nonce = msg.metadata_nonce;
    } else {
        debug!(
            stored = provider.metadata_nonce,
            received = msg.metadata_nonce,
            "metadata nonce not increasing, keeping stored"
        );
    }
    provider.status = msg.status;
    provider.min_contract_duration = msg.min_contract_duration;
    provider.max_contract_duration = msg.max_contract_duration;
    provider.subscription_rate = msg.subscription_rate.clone();
    provider.pay_as_you_go_rate = msg.pay_as_you_go_rate.clone();
    provider.settlement_duration = msg.settlement_duration;
    provider.pay_as_you_go_enabled = msg.pay_as_you_go_enabled;
    provider.last_update = ctx.height();

    tables::set_provider(ctx.store_mut(), &provider)?;
    ctx.emit(Event::provider_mod(&provider));
    Ok(())
}
