//! Protocol constants.
//!
//! All durations are in seconds. Curves are stored scaled by
//! [`MAX_LOCK_DURATION`], so a lock of `amount` ending at `end` contributes
//! `slope = amount` and `bias = amount * (end - now)`. Dividing a scaled value
//! by [`POWER_SCALE`] yields voting power in stake-token units.

pub const DAY: u64 = 86_400;

/// Width of one bucket (epoch). Votes, weights and revenue snapshots are
/// discretised on this grid.
pub const WEEK: u64 = 7 * DAY;
pub const BUCKET: u64 = WEEK;
pub const YEAR: u64 = 365 * DAY;

/// Longest permitted lock, measured from the time of the call.
///
/// # Examples
///
/// ```
/// use wane_core::constants::{MAX_LOCK_DURATION, YEAR};
/// assert_eq!(MAX_LOCK_DURATION, 4 * YEAR);
/// ```
pub const MAX_LOCK_DURATION: u64 = 4 * YEAR;

/// Divisor turning a scaled curve value into voting power.
pub const POWER_SCALE: u128 = MAX_LOCK_DURATION as u128;

/// Buckets a single call may walk on the global curve before it must stop
/// and ask for another checkpoint.
pub const MAX_CATCH_UP_BUCKETS: u64 = 255;

/// Voting budget per participant, in basis points.
pub const VOTE_BUDGET_BPS: u64 = 10_000;
pub const BPS_PRECISION: u64 = 10_000;

/// Minimum spacing between two votes by the same participant on one target.
pub const VOTE_COOLDOWN: u64 = 10 * DAY;

/// Fixed-point unit of relative weights (`1e18` = 100%).
pub const WEIGHT_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Age after which anyone may checkpoint revenue (when public checkpoints
/// are enabled).
pub const TOKEN_CHECKPOINT_DEADLINE: u64 = DAY;

/// Buckets walked per revenue or supply checkpoint call.
pub const MAX_DISTRIBUTION_BUCKETS: u64 = 20;

/// Buckets walked per claim call.
pub const MAX_CLAIM_BUCKETS: u64 = 50;

/// Participants per `claim_many` call.
pub const MAX_CLAIM_BATCH: usize = 20;

/// Snapshot format version written by [`crate::persist`].
pub const SNAPSHOT_VERSION: u16 = 1;
