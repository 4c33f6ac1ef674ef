//! # wane-core
//! Foundation types, traits and math for the Wane vote-escrow protocol.

pub mod access;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod math;
pub mod persist;
pub mod traits;
pub mod types;
