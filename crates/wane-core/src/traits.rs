//! Trait interfaces for the Wane protocol.
//!
//! These traits define the contracts between crates:
//! - [`VotingPower`]: decayed voting power (wane-escrow implements)
//! - [`EmissionSchedule`]: emission-rate source consumed by gauge apportionment
//! - [`TokenLedger`](crate::ledger::TokenLedger) lives in [`crate::ledger`]

use crate::error::LedgerError;
use crate::types::{AccountId, Amount, CatchUp, Timestamp};

/// Read access to time-decayed voting power, plus the global checkpoint
/// hook consumers call before trusting "latest" totals.
///
/// All values are scaled by `MAX_LOCK_DURATION`; divide by
/// [`POWER_SCALE`](crate::constants::POWER_SCALE) for token units.
pub trait VotingPower {
    /// Decayed power of `who` at time `t`. Zero before their first point.
    fn power_of(&self, who: &AccountId, t: Timestamp) -> Amount;

    /// Decayed total supply at time `t`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::CatchUpRequired`] if answering would replay more
    /// buckets than the per-call cap.
    fn total_power_at(&self, t: Timestamp) -> Result<Amount, LedgerError>;

    /// Slope of the latest point of `who` (zero when nothing is locked).
    fn user_slope(&self, who: &AccountId) -> Amount;

    /// Unlock time of the current lock of `who` (zero when nothing is locked).
    fn lock_end(&self, who: &AccountId) -> Timestamp;

    /// Timestamp of the first point ever recorded for `who`.
    fn first_checkpoint(&self, who: &AccountId) -> Option<Timestamp>;

    /// Advance the global curve towards `now`, bounded per call.
    fn checkpoint(&mut self, now: Timestamp) -> Result<CatchUp, LedgerError>;
}

/// External inflation schedule of the emission token.
pub trait EmissionSchedule {
    /// Emission rate (tokens per second) in force at `t`.
    fn rate_at(&self, t: Timestamp) -> Amount;

    /// Tokens emitted over `[start, end)`.
    ///
    /// Default implementation integrates [`rate_at`](Self::rate_at) assuming
    /// the rate is constant over the interval.
    fn mintable_in_timeframe(&self, start: Timestamp, end: Timestamp) -> Amount {
        if end <= start {
            return 0;
        }
        self.rate_at(start).saturating_mul((end - start) as Amount)
    }
}
