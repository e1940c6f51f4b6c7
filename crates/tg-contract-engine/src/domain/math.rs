//! # Share Math
//!
//! Reward and tax math must never halt the chain, so these helpers never
//! fail: out-of-range inputs saturate and degenerate inputs yield zero.

use primitive_types::U256;

/// `allocation * part / total`, with `part` capped at `total`.
///
/// Returns zero when `part` or `total` is zero. The product is computed in
/// 256 bits so it cannot overflow, and the result never exceeds `allocation`.
pub fn safe_share(part: u128, total: u128, allocation: u128) -> u128 {
    if part == 0 || total == 0 || allocation == 0 {
        return 0;
    }
    let part = part.min(total);
    let share = U256::from(allocation) * U256::from(part) / U256::from(total);
    // share <= allocation, so the low 128 bits hold the whole value
    share.low_u128()
}
