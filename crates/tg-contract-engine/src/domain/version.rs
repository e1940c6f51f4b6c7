//! # Protocol Version Consensus
//!
//! Validators announce the software version they run. A version becomes the
//! protocol version once enough bonded validators announce it.

use std::collections::BTreeMap;

/// Version backed by at least `pct`% of the bonded validators, in registry
/// order.
///
/// `announced` holds one entry per bonded validator (0 when it never
/// announced). A single-validator chain adopts that validator's version. Falls
/// back to `current` when no version reaches the threshold.
pub fn consensus_version(announced: &[i64], pct: u64, current: i64) -> i64 {
    match announced {
        [] => return current,
        [only] => return *only,
        _ => {}
    }
    let needed = (announced.len() as u64).saturating_mul(pct) / 100;
    let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
    for version in announced {
        let count = counts.entry(*version).or_default();
        *count += 1;
        if *count >= needed {
            return *version;
        }
    }
    current
}
