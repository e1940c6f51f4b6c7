//! # Validator Payout Planning
//!
//! Pure computation of the per-block validator reward split. The lifecycle
//! executes the resulting plan against the ledger and tolerates individual
//! payment failures.

use shared_types::{AccAddress, BlockHeight};

use crate::domain::config::MAX_BASIS_POINTS;
use crate::domain::entities::ValidatorInfo;
use crate::domain::math::safe_share;

/// A payment to one delegator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegatePayment {
    pub delegator: AccAddress,
    pub amount: u128,
}

/// Everything one validator's stake earns this cycle in one denomination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorPayout {
    pub validator: AccAddress,
    pub denom: String,
    pub delegate_payments: Vec<DelegatePayment>,
    /// Commission withheld from non-self delegations, paid to the validator.
    pub commission: u128,
}

/// Whether payouts run at `height`.
pub fn is_payout_height(height: BlockHeight, cycle: i64) -> bool {
    cycle > 0 && height % cycle == 0
}

/// `reserve / emission_curve / (blocks_per_year / cycle)`, floored.
///
/// Zero when any divisor is zero.
pub fn block_reward(reserve: u128, emission_curve: u128, blocks_per_year: i64, cycle: i64) -> u128 {
    if emission_curve == 0 || cycle <= 0 || blocks_per_year <= 0 {
        return 0;
    }
    let cycles_per_year = u128::try_from(blocks_per_year / cycle).unwrap_or(0);
    if cycles_per_year == 0 {
        return 0;
    }
    reserve / emission_curve / cycles_per_year
}

/// Split `reward` across eligible validators by delegator shares, then across
/// each validator's delegations, withholding commission from non-self
/// delegations.
pub fn plan_payouts(denom: &str, reward: u128, validators: &[ValidatorInfo]) -> Vec<ValidatorPayout> {
    let total: u128 = validators
        .iter()
        .filter(|v| v.is_eligible())
        .fold(0u128, |acc, v| acc.saturating_add(v.delegator_shares));
    if reward == 0 || total == 0 {
        return Vec::new();
    }

    validators
        .iter()
        .filter(|v| v.is_eligible())
        .map(|validator| {
            let portion = safe_share(validator.delegator_shares, total, reward);
            let mut commission = 0u128;
            let delegate_payments = validator
                .delegations
                .iter()
                .map(|delegation| {
                    let mut amount =
                        safe_share(delegation.shares, validator.delegator_shares, portion);
                    if delegation.delegator != validator.address {
                        let fee =
                            safe_share(validator.commission_rate_bps, MAX_BASIS_POINTS, amount);
                        amount -= fee;
                        commission = commission.saturating_add(fee);
                    }
                    DelegatePayment {
                        delegator: delegation.delegator,
                        amount,
                    }
                })
                .collect();
            ValidatorPayout {
                validator: validator.address,
                denom: denom.to_string(),
                delegate_payments,
                commission,
            }
        })
        .collect()
}
