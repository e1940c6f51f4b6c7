//! BondProvider: post, top up or withdraw provider collateral.

use shared_types::{AccAddress, Coin, Holder, ModuleAccount};
use tracing::info;

use crate::domain::entities::Provider;
use crate::domain::errors::EngineError;
use crate::domain::messages::MsgBondProvider;
use crate::events::Event;
use crate::store::{tables, Ctx};

pub fn validate(ctx: &Ctx<'_>, msg: &MsgBondProvider) -> Result<(), EngineError> {
    if ctx.config().handlers.bond_provider_disabled {
        return Err(EngineError::DisabledHandler("bond_provider"));
    }
    if msg.bond > 0 {
        super::require_registered(ctx, &msg.service)?;
    }
    if msg.bond < 0 {
        let requested = msg.bond.unsigned_abs();
        let available = tables::get_provider(ctx.store(), &msg.provider, &msg.service)?
            .map(|p| p.bond)
            .unwrap_or(0);
        if requested > available {
            return Err(EngineError::InsufficientBond {
                requested,
                available,
            });
        }
    }
    Ok(())
}

/// Moves the bond delta between the signer and the bond pool. A provider
/// whose bond reaches zero is deleted; its open contracts keep settling
/// against their own escrow.
pub fn handle(ctx: &mut Ctx<'_>, signer: &AccAddress, msg: &MsgBondProvider) -> Result<(), EngineError> {
    let mut provider = tables::get_provider(ctx.store(), &msg.provider, &msg.service)?
        .unwrap_or_else(|| Provider::new(msg.provider, msg.service.clone()));

    let amount = msg.bond.unsigned_abs();
    let coin = Coin::new(ctx.config().native_denom.clone(), amount);
    let account = Holder::Account(*signer);
    let pool = Holder::Module(ModuleAccount::ProviderBond);

    if msg.bond > 0 {
        ctx.ledger_mut().transfer(&account, &pool, &coin)?;
        provider.bond = provider
            .bond
            .checked_add(amount)
            .ok_or(EngineError::Overflow("provider bond"))?;
    } else {
        provider.bond = provider
            .bond
            .checked_sub(amount)
            .ok_or(EngineError::InsufficientBond {
                requested: amount,
                available: provider.bond,
            })?;
        ctx.ledger_mut().transfer(&pool, &account, &coin)?;
    }

    if provider.bond == 0 {
        tables::remove_provider(ctx.store_mut(), &provider.pubkey, &provider.service)?;
        info!(provider = %provider.pubkey, service = %provider.service, "provider fully unbonded");
    } else {
        provider.last_update = ctx.height();
        tables::set_provider(ctx.store_mut(), &provider)?;
    }

    ctx.emit(Event::bond_provider(
        &provider.pubkey,
        &provider.service,
        msg.bond,
        provider.bond,
    ));
    Ok(())
}
