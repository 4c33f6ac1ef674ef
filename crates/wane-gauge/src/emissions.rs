//! Emission schedules and per-target apportionment.
//!
//! The controller only answers "what share does a target get"; the number of
//! tokens minted per second comes from an [`EmissionSchedule`]. This module
//! provides two schedules and the bucket-by-bucket split that combines them.
//!
//! [`HalvingEmission`] follows the classic halving curve:
//! - Epoch 0 (`[start, start + epoch_length)`): `initial_rate` per second
//! - Epoch 1: `initial_rate / 2`
//! - …
//! - Epoch 128+: 0 (shift guard)

use serde::{Deserialize, Serialize};

use wane_core::constants::{WEEK, WEIGHT_PRECISION};
use wane_core::error::GaugeError;
use wane_core::math::mul_div;
use wane_core::traits::EmissionSchedule;
use wane_core::types::{AccountId, Amount, Timestamp, bucket_floor};

use crate::controller::GaugeController;

/// Constant emission rate from `start` onwards; nothing before it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlatEmission {
    pub rate: Amount,
    pub start: Timestamp,
}

impl EmissionSchedule for FlatEmission {
    fn rate_at(&self, t: Timestamp) -> Amount {
        if t < self.start { 0 } else { self.rate }
    }

    fn mintable_in_timeframe(&self, start: Timestamp, end: Timestamp) -> Amount {
        let start = start.max(self.start);
        if end <= start {
            return 0;
        }
        self.rate.saturating_mul((end - start) as Amount)
    }
}

/// Emission rate that halves every `epoch_length` seconds after `start`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct HalvingEmission {
    pub initial_rate: Amount,
    pub epoch_length: u64,
    pub start: Timestamp,
}

impl HalvingEmission {
    /// Halving epoch containing `t`, or `None` before `start`.
    pub fn epoch_of(&self, t: Timestamp) -> Option<u64> {
        if t < self.start {
            return None;
        }
        Some((t - self.start) / self.epoch_length.max(1))
    }

    /// Rate in force during `epoch`. Zero from epoch 128 on.
    pub fn epoch_rate(&self, epoch: u64) -> Amount {
        if epoch >= 128 {
            return 0;
        }
        self.initial_rate >> epoch
    }

    /// First second of `epoch`.
    pub fn epoch_start(&self, epoch: u64) -> Timestamp {
        self.start.saturating_add(epoch.saturating_mul(self.epoch_length.max(1)))
    }
}

impl EmissionSchedule for HalvingEmission {
    fn rate_at(&self, t: Timestamp) -> Amount {
        self.epoch_of(t).map_or(0, |e| self.epoch_rate(e))
    }

    /// Integrates across every halving boundary inside `[start, end)`.
    fn mintable_in_timeframe(&self, start: Timestamp, end: Timestamp) -> Amount {
        let mut t = start.max(self.start);
        let mut total: Amount = 0;
        while t < end {
            let Some(epoch) = self.epoch_of(t) else { break };
            let rate = self.epoch_rate(epoch);
            if rate == 0 {
                break;
            }
            let boundary = self.epoch_start(epoch.saturating_add(1)).min(end);
            if boundary <= t {
                break;
            }
            total = total.saturating_add(rate.saturating_mul((boundary - t) as Amount));
            t = boundary;
        }
        total
    }
}

/// Tokens emitted to `target` over `[from, to)`.
///
/// The interval is split at bucket boundaries; each segment receives its
/// mintable amount scaled by the target's relative weight in that bucket.
///
/// # Errors
///
/// [`GaugeError::TargetNotFound`] if `target` is not registered.
pub fn target_emissions(
    controller: &GaugeController,
    schedule: &dyn EmissionSchedule,
    target: &AccountId,
    from: Timestamp,
    to: Timestamp,
) -> Result<Amount, GaugeError> {
    let mut total: Amount = 0;
    let mut t = from;
    while t < to {
        let segment_end = (bucket_floor(t) + WEEK).min(to);
        let share = controller.relative_weight(target, t)?;
        if share > 0 {
            let minted = schedule.mintable_in_timeframe(t, segment_end);
            let part = mul_div(minted, share, WEIGHT_PRECISION).ok_or(GaugeError::ArithmeticOverflow)?;
            total = total.checked_add(part).ok_or(GaugeError::ArithmeticOverflow)?;
        }
        t = segment_end;
    }
    Ok(total)
}
