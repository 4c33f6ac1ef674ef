//! Cross-crate test suite for Wane.
//!
//! Integration tests wire the escrow, gauge controller and fee distributor
//! to one in-memory token ledger and drive them through full lifecycles.
//! Property tests try to break the protocol invariants under random input.

pub mod helpers;
