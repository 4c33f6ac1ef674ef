//! # wane-gauge — Vote-weighted gauge controller.
//!
//! Participants spend a basis-point budget of their escrowed voting power on
//! registered targets; targets are grouped into weighted categories.
//!
//! - **Bucket clock**: all weights live on the weekly bucket grid and every
//!   change takes effect from the next bucket.
//! - **Decaying votes**: a vote contributes a slope that runs out at the
//!   voter's unlock time, tracked with its own slope-change schedule.
//! - **Relative weight**: a target's category-weighted share of the total,
//!   fixed-point with `WEIGHT_PRECISION`.
//! - **Emissions**: [`emissions::target_emissions`] combines relative weights
//!   with an external [`EmissionSchedule`](wane_core::traits::EmissionSchedule).

pub mod controller;
pub mod emissions;
pub mod series;

pub use controller::{GaugeController, VoteRecord};
pub use emissions::{FlatEmission, HalvingEmission, target_emissions};
pub use series::{BucketSeries, DecayingWeight, LevelWeight, WeightPoint};
