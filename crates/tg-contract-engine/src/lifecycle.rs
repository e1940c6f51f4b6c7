//! # Block Lifecycle
//!
//! Hooks run around the transactions of every block:
//!
//! | Hook | When | Failure |
//! |------|------|---------|
//! | version gate | begin block | propagates |
//! | expiration sweep | end block, every height | per contract: logged, retried next height |
//! | validator payout | end block, every `validator_payout_cycle` | per payment: logged, skipped |
//! | invariant check | end block, last | fatal |

use std::collections::BTreeMap;

use shared_types::{BlockHeight, Coin, Holder, ModuleAccount};
use tracing::{debug, error, info, warn};

use crate::domain::config::ConfigRegistry;
use crate::domain::entities::VoteInfo;
use crate::domain::errors::EngineError;
use crate::domain::invariants::{check_all_invariants, SolvencySnapshot};
use crate::domain::payout::{block_reward, is_payout_height, plan_payouts};
use crate::domain::version::consensus_version;
use crate::events::Event;
use crate::ports::{KvStore, ValidatorRegistry};
use crate::settlement::finalize;
use crate::store::{tables, Ctx};

// =============================================================================
// BEGIN BLOCK
// =============================================================================

/// Adopt the version announced by enough bonded validators.
///
/// Returns the protocol version in force for this block and, when it moved,
/// the upgrade event. The version never decreases and must have a
/// configuration.
pub fn version_gate<K, R>(
    store: &mut K,
    registry: &R,
    configs: &ConfigRegistry,
    height: BlockHeight,
) -> Result<(i64, Option<Event>), EngineError>
where
    K: KvStore + ?Sized,
    R: ValidatorRegistry + ?Sized,
{
    let current = tables::get_version(store)?;
    let config = configs.for_version(current)?;

    let mut announced = Vec::new();
    for validator in registry.bonded_validators()? {
        announced.push(tables::get_validator_version(store, &validator.address)?);
    }
    let consensus = consensus_version(&announced, config.version_consensus_pct, current);
    if consensus <= current {
        return Ok((current, None));
    }

    configs.for_version(consensus)?;
    tables::set_version(store, consensus)?;
    info!(from = current, to = consensus, height, "protocol version upgraded");
    Ok((consensus, Some(Event::protocol_upgrade(current, consensus, height))))
}

// =============================================================================
// END BLOCK
// =============================================================================

/// Sweep, pay validators when due, then check invariants.
pub fn end_block<R>(ctx: &mut Ctx<'_>, registry: &R, votes: &[VoteInfo]) -> Result<(), EngineError>
where
    R: ValidatorRegistry + ?Sized,
{
    sweep_expired(ctx)?;
    if is_payout_height(ctx.height(), ctx.config().validator_payout_cycle) {
        distribute_payouts(ctx, registry, votes)?;
    }
    check_invariants(ctx)
}

/// Finalize every contract due at the current height, then clear the bucket.
///
/// Each contract settles in its own scratch context; a failure is logged and
/// the remaining contracts still settle. A contract that failed moves to the
/// bucket of the next height so its escrow is not stranded. Returns how many
/// settled.
pub fn sweep_expired(ctx: &mut Ctx<'_>) -> Result<usize, EngineError> {
    let height = ctx.height();
    let due = tables::expiration_ids(ctx.store(), height)?;
    if due.is_empty() {
        return Ok(0);
    }

    let mut settled = 0;
    let mut retry = Vec::new();
    for id in &due {
        let result = ctx.with_cache(|scratch| {
            let contract = tables::get_contract(scratch.store(), *id)?
                .ok_or(EngineError::ContractNotFound(*id))?;
            let nonce = contract.nonce;
            finalize(scratch, contract, nonce, true)
        });
        match result {
            Ok(_) => settled += 1,
            Err(err) => match tables::get_contract(ctx.store(), *id)? {
                Some(contract) => {
                    error!(
                        contract_id = *id,
                        height,
                        outstanding = %contract.outstanding(),
                        error = %err,
                        "failed to settle expired contract, retrying next height"
                    );
                    retry.push(*id);
                }
                None => error!(contract_id = *id, height, error = %err, "failed to settle expired contract"),
            },
        }
    }

    tables::clear_expiration(ctx.store_mut(), height)?;
    if !retry.is_empty() {
        let next = height
            .checked_add(1)
            .ok_or(EngineError::Overflow("expiration height"))?;
        for id in &retry {
            tables::add_to_expiration(ctx.store_mut(), next, *id)?;
        }
    }
    debug!(height, due = due.len(), settled, retried = retry.len(), "expiration sweep done");
    Ok(settled)
}

/// Pay validators and their delegators out of the reserve.
///
/// Runs once per reserve denomination. Individual payment failures are
/// logged and skipped; reward math never halts the chain.
pub fn distribute_payouts<R>(ctx: &mut Ctx<'_>, registry: &R, votes: &[VoteInfo]) -> Result<(), EngineError>
where
    R: ValidatorRegistry + ?Sized,
{
    let reserve = Holder::Module(ModuleAccount::Reserve);
    let (emission_curve, blocks_per_year, cycle) = {
        let config = ctx.config();
        (
            config.emission_curve,
            config.blocks_per_year,
            config.validator_payout_cycle,
        )
    };
    let validators = registry.bonded_signing_validators(votes)?;

    for denom in ctx.ledger().denoms(&reserve)? {
        let balance = ctx.ledger().balance(&reserve, &denom)?;
        let reward = block_reward(balance, emission_curve, blocks_per_year, cycle);
        if reward == 0 {
            info!(denom = %denom, "no validator rewards this block");
            continue;
        }
        let plans = plan_payouts(&denom, reward, &validators);
        if plans.is_empty() {
            debug!(denom = %denom, "no eligible signing stake, skipping payout");
            continue;
        }

        for plan in plans {
            for payment in &plan.delegate_payments {
                if payment.amount == 0 {
                    continue;
                }
                let coin = Coin::new(denom.clone(), payment.amount);
                match ctx
                    .ledger_mut()
                    .transfer(&reserve, &Holder::Account(payment.delegator), &coin)
                {
                    Ok(()) => debug!(delegate = %payment.delegator, amount = %coin, "delegate rewarded"),
                    Err(err) => {
                        error!(delegate = %payment.delegator, error = %err, "unable to pay delegate reward")
                    }
                }
            }

            let commission = Coin::new(denom.clone(), plan.commission);
            if plan.commission > 0 {
                if let Err(err) =
                    ctx.ledger_mut()
                        .transfer(&reserve, &Holder::Account(plan.validator), &commission)
                {
                    error!(validator = %plan.validator, error = %err, "unable to pay validator commission");
                    continue;
                }
                info!(validator = %plan.validator, amount = %commission, "validator commission paid");
            }
            ctx.emit(Event::validator_payout(&plan.validator, &commission));
        }
    }
    Ok(())
}

/// Gather pool balances and recorded obligations.
pub fn solvency_snapshot(ctx: &Ctx<'_>) -> Result<SolvencySnapshot, EngineError> {
    let native = ctx.config().native_denom.as_str();
    let ledger = ctx.ledger();
    let store = ctx.store();

    let total_bonded = tables::providers(store)?
        .iter()
        .fold(0u128, |acc, p| acc.saturating_add(p.bond));

    let mut escrow_owed: BTreeMap<String, u128> = BTreeMap::new();
    for contract in tables::contracts(store)? {
        if contract.is_settled() {
            continue;
        }
        let owed = escrow_owed.entry(contract.rate.denom.clone()).or_default();
        *owed = owed.saturating_add(contract.outstanding());
    }

    let escrow = Holder::Module(ModuleAccount::ContractEscrow);
    let mut escrow_pool = BTreeMap::new();
    for denom in ledger.denoms(&escrow)? {
        let balance = ledger.balance(&escrow, &denom)?;
        escrow_pool.insert(denom, balance);
    }

    Ok(SolvencySnapshot {
        bond_pool: ledger.balance(&Holder::Module(ModuleAccount::ProviderBond), native)?,
        total_bonded,
        escrow_pool,
        escrow_owed,
        supply: ledger.supply(native)?,
        max_supply: ctx.config().max_supply,
    })
}

/// Fatal on any violation.
pub fn check_invariants(ctx: &Ctx<'_>) -> Result<(), EngineError> {
    let snapshot = solvency_snapshot(ctx)?;
    let result = check_all_invariants(&snapshot);
    if result.is_ok() {
        return Ok(());
    }
    for violation in &result.violations {
        error!(?violation, height = ctx.height(), "invariant violated, halting");
    }
    warn!(count = result.violations.len(), "refusing to commit block");
    Err(EngineError::InvariantBroken {
        violations: result.violations,
    })
}
