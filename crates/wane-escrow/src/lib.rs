//! # wane-escrow — Vote-escrow decay ledger and checkpoint store.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Locks**: one per participant, bucket-aligned unlock time, at most
//!   `MAX_LOCK_DURATION` ahead.
//! - **Decay curves**: each lock contributes a linear curve reaching zero at
//!   its unlock time; curves are stored scaled by `MAX_LOCK_DURATION` so the
//!   global curve is the exact sum of user curves.
//! - **Checkpoint store**: per-participant and global point histories with
//!   binary-search lookup by time or by sequence number, plus a schedule of
//!   slope decrements consumed as the global curve is walked forward.
//! - **Bounded catch-up**: no call walks more than `catch_up_limit` buckets.

pub mod escrow;
pub mod history;
pub mod point;

pub use escrow::VotingEscrow;
pub use history::{PointHistory, SlopeSchedule};
pub use point::{LockedBalance, Point};
