//! Integer arithmetic helpers.
//!
//! All protocol math is integer-only. Products that may exceed 128 bits
//! (relative weights, revenue shares) go through [`mul_div`], which keeps a
//! full 256-bit intermediate and is exact up to the final floor division.

use primitive_types::U256;

use crate::constants::{BPS_PRECISION, POWER_SCALE};
use crate::types::Amount;

/// `floor(a * b / d)` with a 256-bit intermediate.
///
/// Returns `None` when `d == 0` or the quotient does not fit in `u128`.
///
/// # Examples
///
/// ```
/// use wane_core::math::mul_div;
/// assert_eq!(mul_div(7, 3, 2), Some(10));
/// assert_eq!(mul_div(u128::MAX, u128::MAX, u128::MAX), Some(u128::MAX));
/// assert_eq!(mul_div(1, 1, 0), None);
/// ```
pub fn mul_div(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    if let Some(p) = a.checked_mul(b) {
        return Some(p / d);
    }
    // Two u128 factors never overflow 256 bits.
    let q = U256::from(a) * U256::from(b) / U256::from(d);
    (q.bits() <= 128).then(|| q.as_u128())
}

/// Convert a curve value scaled by `MAX_LOCK_DURATION` into token units.
pub fn to_power(scaled: u128) -> Amount {
    scaled / POWER_SCALE
}

/// `amount * bps / 10_000`, floored. `None` on overflow.
pub fn apply_bps(amount: Amount, bps: u64) -> Option<Amount> {
    mul_div(amount, bps as u128, BPS_PRECISION as u128)
}
