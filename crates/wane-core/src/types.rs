//! Core protocol types: identifiers, amounts and time helpers.
//!
//! Timestamps are Unix seconds (`u64`). Amounts are token base units
//! (`u128`), wide enough that `amount * MAX_LOCK_DURATION` never overflows
//! for any realistic supply.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::WEEK;

pub type Timestamp = u64;
pub type Amount = u128;

/// 1-based category identifier. `0` is reserved as "unset".
pub type CategoryId = u32;

/// A 32-byte participant or contract address.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    /// The zero address. Never a valid holder or recipient.
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Deterministic address derived from a label with BLAKE3.
    ///
    /// Used for contract accounts (escrow, distributor, pools) and in tests.
    ///
    /// # Examples
    ///
    /// ```
    /// use wane_core::types::AccountId;
    /// let a = AccountId::derive("alice");
    /// assert_eq!(a, AccountId::derive("alice"));
    /// assert_ne!(a, AccountId::derive("bob"));
    /// assert!(!a.is_zero());
    /// ```
    pub fn derive(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    /// Parse a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Identifier of a fungible token held in a [`crate::ledger::TokenLedger`].
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
    bincode::Encode, bincode::Decode,
)]
pub struct TokenId(pub u32);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "token#{}", self.0)
    }
}

/// Outcome of a bounded catch-up walk.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CatchUp {
    /// The walk reached the requested time.
    Complete,
    /// The walk stopped at the iteration cap; call again to continue.
    Partial { reached: Timestamp },
}

impl CatchUp {
    pub fn is_complete(&self) -> bool {
        matches!(self, CatchUp::Complete)
    }
}

/// Start of the bucket containing `t`.
///
/// # Examples
///
/// ```
/// use wane_core::types::bucket_floor;
/// use wane_core::constants::WEEK;
/// assert_eq!(bucket_floor(WEEK + 5), WEEK);
/// assert_eq!(bucket_floor(WEEK), WEEK);
/// ```
pub fn bucket_floor(t: Timestamp) -> Timestamp {
    t / WEEK * WEEK
}

/// Smallest bucket boundary `>= t`. Saturates near `u64::MAX`.
pub fn bucket_ceil(t: Timestamp) -> Timestamp {
    let floor = bucket_floor(t);
    if floor == t { t } else { floor.saturating_add(WEEK) }
}

/// First bucket boundary strictly after `t`.
pub fn next_bucket(t: Timestamp) -> Timestamp {
    bucket_floor(t).saturating_add(WEEK)
}

/// Number of whole buckets between the buckets containing `from` and `to`.
pub fn buckets_between(from: Timestamp, to: Timestamp) -> u64 {
    bucket_floor(to).saturating_sub(bucket_floor(from)) / WEEK
}
