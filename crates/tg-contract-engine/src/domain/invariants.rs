//! # Domain Invariants
//!
//! Solvency and supply invariants checked at every block end. Any violation
//! is fatal: block production halts rather than continue on corrupt books.
//!
//! - Bond pool balance >= sum of recorded provider bonds
//! - Escrow pool balance, per denomination, >= sum of `deposit - paid` over
//!   unsettled contracts
//! - Native supply <= configured maximum

use std::collections::BTreeMap;

use serde::Serialize;

// =============================================================================
// INVARIANT CHECKS
// =============================================================================

/// Ledger and store totals gathered at block end.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolvencySnapshot {
    /// Bond pool balance in the native denomination.
    pub bond_pool: u128,
    /// Sum of provider bonds.
    pub total_bonded: u128,
    /// Escrow pool balance per denomination.
    pub escrow_pool: BTreeMap<String, u128>,
    /// Outstanding obligations per denomination.
    pub escrow_owed: BTreeMap<String, u128>,
    /// Native supply.
    pub supply: u128,
    /// Configured supply cap.
    pub max_supply: u128,
}

/// Bond pool covers every recorded bond.
#[must_use]
pub fn check_bond_pool_invariant(snapshot: &SolvencySnapshot) -> bool {
    snapshot.bond_pool >= snapshot.total_bonded
}

/// Escrow pool covers every outstanding obligation, denomination by
/// denomination.
#[must_use]
pub fn check_escrow_invariant(snapshot: &SolvencySnapshot) -> Vec<InvariantViolation> {
    snapshot
        .escrow_owed
        .iter()
        .filter_map(|(denom, owed)| {
            let pool = snapshot.escrow_pool.get(denom).copied().unwrap_or(0);
            (pool < *owed).then(|| InvariantViolation::EscrowShortfall {
                denom: denom.clone(),
                pool,
                owed: *owed,
            })
        })
        .collect()
}

/// Supply stays under the cap.
#[must_use]
pub fn check_supply_invariant(snapshot: &SolvencySnapshot) -> bool {
    snapshot.supply <= snapshot.max_supply
}

/// Check all invariants at once.
#[must_use]
pub fn check_all_invariants(snapshot: &SolvencySnapshot) -> InvariantCheckResult {
    let mut violations = Vec::new();

    if !check_bond_pool_invariant(snapshot) {
        violations.push(InvariantViolation::BondPoolShortfall {
            pool: snapshot.bond_pool,
            bonded: snapshot.total_bonded,
        });
    }

    violations.extend(check_escrow_invariant(snapshot));

    if !check_supply_invariant(snapshot) {
        violations.push(InvariantViolation::SupplyExceeded {
            supply: snapshot.supply,
            max: snapshot.max_supply,
        });
    }

    InvariantCheckResult { violations }
}

/// Result of checking all invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantCheckResult {
    /// List of violations (empty if all passed).
    pub violations: Vec<InvariantViolation>,
}

impl InvariantCheckResult {
    /// Check if all invariants passed.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Types of invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InvariantViolation {
    /// Bond pool holds less than the recorded bonds.
    BondPoolShortfall { pool: u128, bonded: u128 },
    /// Escrow pool holds less than outstanding deposits for a denomination.
    EscrowShortfall { denom: String, pool: u128, owed: u128 },
    /// Native supply above the cap.
    SupplyExceeded { supply: u128, max: u128 },
}
