//! # wane-fees — Epoch snapshot fee distributor.
//!
//! - **Revenue buckets**: revenue received between two checkpoints is split
//!   across the weekly buckets it spans, pro rata by elapsed time, with
//!   rounding dust carried forward.
//! - **Supply snapshots**: total escrow voting power is recorded at the start
//!   of each bucket.
//! - **Claims**: a participant is owed `power × bucket_revenue / supply` for
//!   every fully distributed bucket since their last claim.
//! - **Intake**: revenue held in another token can be settled into the
//!   revenue token through a reserve pool.

pub mod distributor;
pub mod intake;

pub use distributor::{DistributorStatus, FeeDistributor};
pub use intake::{DepositAmount, RevenueIntake};
