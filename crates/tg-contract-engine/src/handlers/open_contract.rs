//! OpenContract: escrow a deposit against a provider's published terms.

use shared_types::{AccAddress, BlockHeight, Coin, Holder, ModuleAccount, PubKey, Service};
use tracing::{debug, info};

use crate::domain::entities::{Authorization, Contract, ContractKind, ProviderStatus};
use crate::domain::errors::EngineError;
use crate::domain::messages::MsgOpenContract;
use crate::events::Event;
use crate::ports::KvStore;
use crate::store::{tables, Ctx};

/// The open contract of `spender` with `(provider, service)` at `height`, if
/// any.
pub fn find_active_contract<K: KvStore + ?Sized>(
    store: &K,
    spender: &PubKey,
    provider: &PubKey,
    service: &Service,
    height: BlockHeight,
) -> Result<Option<Contract>, EngineError> {
    for id in tables::user_contract_ids(store, spender)? {
        let Some(contract) = tables::get_contract(store, id)? else {
            debug!(contract_id = id, "indexed contract missing, skipping");
            continue;
        };
        if contract.provider == *provider
            && contract.service == *service
            && contract.is_active_at(height)
        {
            return Ok(Some(contract));
        }
    }
    Ok(None)
}

pub fn validate(ctx: &Ctx<'_>, msg: &MsgOpenContract) -> Result<(), EngineError> {
    let config = ctx.config();
    if config.handlers.open_contract_disabled {
        return Err(EngineError::DisabledHandler("open_contract"));
    }
    super::require_registered(ctx, &msg.service)?;

    let provider = tables::get_provider(ctx.store(), &msg.provider, &msg.service)?.ok_or_else(
        || EngineError::ProviderNotFound {
            provider: msg.provider.to_string(),
            service: msg.service.to_string(),
        },
    )?;
    if provider.bond < config.min_provider_bond {
        return Err(EngineError::InsufficientBond {
            requested: config.min_provider_bond,
            available: provider.bond,
        });
    }
    if provider.status != ProviderStatus::Online {
        return Err(EngineError::BadProviderStatus);
    }

    if msg.duration < provider.min_contract_duration || msg.duration > provider.max_contract_duration {
        return Err(EngineError::ContractDuration {
            duration: msg.duration,
            min: provider.min_contract_duration,
            max: provider.max_contract_duration,
        });
    }
    if msg.settlement_duration != provider.settlement_duration {
        return Err(EngineError::MismatchSettlementDuration {
            expected: provider.settlement_duration,
            actual: msg.settlement_duration,
        });
    }
    let offered = provider
        .rates_for(msg.contract_type)
        .is_some_and(|rates| rates.contains(&msg.rate));
    if !offered {
        return Err(EngineError::MismatchRate(msg.rate.clone()));
    }

    match msg.contract_type {
        ContractKind::Subscription => {
            let duration = u128::try_from(msg.duration).unwrap_or(0);
            let expected = msg
                .rate
                .amount
                .checked_mul(duration)
                .ok_or(EngineError::Overflow("subscription deposit"))?;
            if msg.deposit != expected {
                return Err(EngineError::MismatchDeposit {
                    expected,
                    actual: msg.deposit,
                });
            }
        }
        ContractKind::PayAsYouGo => {
            if msg.authorization == Authorization::Open {
                return Err(EngineError::OpenPayAsYouGoAuthorization);
            }
        }
    }

    let spender = msg.delegate.unwrap_or(msg.client);
    if let Some(existing) =
        find_active_contract(ctx.store(), &spender, &msg.provider, &msg.service, ctx.height())?
    {
        return Err(EngineError::AlreadyOpen(existing.id));
    }
    Ok(())
}

/// Charges the open fee and the deposit, then records and indexes the
/// contract.
pub fn handle(ctx: &mut Ctx<'_>, signer: &AccAddress, msg: &MsgOpenContract) -> Result<(), EngineError> {
    let account = Holder::Account(*signer);
    let open_cost = ctx.config().open_contract_cost;
    if open_cost > 0 {
        let fee = Coin::new(ctx.config().native_denom.clone(), open_cost);
        ctx.ledger_mut()
            .transfer(&account, &Holder::Module(ModuleAccount::Reserve), &fee)?;
    }
    ctx.ledger_mut().transfer(
        &account,
        &Holder::Module(ModuleAccount::ContractEscrow),
        &Coin::new(msg.rate.denom.clone(), msg.deposit),
    )?;

    let id = tables::allocate_contract_id(ctx.store_mut())?;
    let contract = Contract {
        id,
        provider: msg.provider,
        service: msg.service.clone(),
        client: msg.client,
        delegate: msg.delegate,
        kind: msg.contract_type,
        authorization: msg.authorization,
        height: ctx.height(),
        duration: msg.duration,
        settlement_duration: msg.settlement_duration,
        rate: msg.rate.clone(),
        deposit: msg.deposit,
        paid: 0,
        nonce: 0,
        queries_per_minute: msg.queries_per_minute,
        settlement_height: 0,
        closed_height: 0,
    };

    tables::add_to_expiration(ctx.store_mut(), contract.expiration(), id)?;
    tables::add_user_contract(ctx.store_mut(), &contract.spender(), id)?;
    tables::set_contract(ctx.store_mut(), &contract)?;

    info!(
        contract_id = id,
        provider = %contract.provider,
        service = %contract.service,
        kind = contract.kind.as_str(),
        expires = contract.expiration(),
        "contract opened"
    );
    ctx.emit(Event::open_contract(&contract, open_cost));
    Ok(())
}
