//! Decay-curve snapshots and lock records.
//!
//! Values are scaled by `MAX_LOCK_DURATION`: a lock of `amount` ending at
//! `end` has `slope = amount` and, at time `now`, `bias = amount * (end - now)`.
//! Both are exact integers, so the global curve is an exact sum of user
//! curves.

use serde::{Deserialize, Serialize};
use wane_core::error::LedgerError;
use wane_core::types::{Amount, Timestamp};

/// A decay line: `max(0, bias - slope * (t - ts))` for `t >= ts`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode,
    bincode::Decode,
)]
pub struct Point {
    pub bias: Amount,
    pub slope: Amount,
    pub ts: Timestamp,
    /// Sequence number of the call that wrote this point.
    pub seq: u64,
}

impl Point {
    pub fn new(bias: Amount, slope: Amount, ts: Timestamp, seq: u64) -> Self {
        Self { bias, slope, ts, seq }
    }

    /// Value of the line at `t`, clamped at zero.
    ///
    /// Times before `ts` return `bias`; a point never extrapolates backwards.
    pub fn value_at(&self, t: Timestamp) -> Amount {
        if t <= self.ts {
            return self.bias;
        }
        let decayed = self.slope.saturating_mul((t - self.ts) as Amount);
        self.bias.saturating_sub(decayed)
    }
}

/// Stake held by one participant.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode,
    bincode::Decode,
)]
pub struct LockedBalance {
    pub amount: Amount,
    /// Bucket-aligned unlock time. Zero once withdrawn.
    pub end: Timestamp,
}

impl LockedBalance {
    pub fn new(amount: Amount, end: Timestamp) -> Self {
        Self { amount, end }
    }

    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.end <= now
    }

    /// `(slope, bias)` of this lock's curve as seen from `now`.
    ///
    /// Expired or empty locks contribute nothing.
    pub fn curve(&self, now: Timestamp) -> Result<(Amount, Amount), LedgerError> {
        if self.amount == 0 || self.end <= now {
            return Ok((0, 0));
        }
        let bias = self
            .amount
            .checked_mul((self.end - now) as Amount)
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok((self.amount, bias))
    }
}
