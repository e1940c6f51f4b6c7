//! # Settlement Math
//!
//! Pure conversion of elapsed time or reported usage into owed debt, and the
//! split of that debt between the provider and the reserve. Token movement
//! and persistence live in [`crate::settlement`].

use shared_types::BlockHeight;

use crate::domain::config::MAX_BASIS_POINTS;
use crate::domain::entities::{Contract, ContractKind};
use crate::domain::math::safe_share;

/// Result of settling a contract at a given height and nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    /// Nonce the contract carries after settlement.
    pub nonce: i64,
    /// Total debt released from escrow.
    pub debt: u128,
    /// Part of `debt` paid to the provider.
    pub provider_share: u128,
    /// Part of `debt` paid to the reserve.
    pub reserve_share: u128,
}

/// Debt owed right now.
///
/// Subscription: `rate * (height - open_height) - paid`.
/// Pay-as-you-go: `rate * nonce - paid`.
/// Negative results clamp to zero and `paid + debt` never exceeds `deposit`.
pub fn contract_debt(contract: &Contract, nonce: i64, height: BlockHeight) -> u128 {
    let units = match contract.kind {
        ContractKind::Subscription => height.saturating_sub(contract.height),
        ContractKind::PayAsYouGo => nonce,
    };
    let units = u128::try_from(units).unwrap_or(0);
    contract
        .rate
        .amount
        .saturating_mul(units)
        .saturating_sub(contract.paid)
        .min(contract.outstanding())
}

/// Split `debt` into `(provider_share, reserve_share)`.
pub fn split_debt(debt: u128, reserve_tax_bps: u128) -> (u128, u128) {
    let reserve = safe_share(reserve_tax_bps, MAX_BASIS_POINTS, debt);
    (debt - reserve, reserve)
}

/// Compute the settlement for a claim carrying `nonce` at `height`.
///
/// A nonce above the stored one is adopted first.
pub fn compute_settlement(
    contract: &Contract,
    nonce: i64,
    height: BlockHeight,
    reserve_tax_bps: u128,
) -> Settlement {
    let nonce = nonce.max(contract.nonce);
    let debt = contract_debt(contract, nonce, height);
    let (provider_share, reserve_share) = split_debt(debt, reserve_tax_bps);
    Settlement {
        nonce,
        debt,
        provider_share,
        reserve_share,
    }
}
