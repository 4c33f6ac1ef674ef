//! Error types for the Wane protocol.
use thiserror::Error;

use crate::types::{Amount, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("admin only")] AdminOnly,
    #[error("future admin only")] FutureAdminOnly,
    #[error("no pending admin")] NoPendingAdmin,
    #[error("admin cannot be the zero address")] ZeroAdmin,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: Amount, need: Amount },
    #[error("zero address")] ZeroAddress,
    #[error("balance overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("need non-zero value")] ZeroAmount,
    #[error("withdraw old tokens first")] LockExists,
    #[error("no existing lock found")] NoLock,
    #[error("cannot add to expired lock")] LockExpired,
    #[error("the lock didn't expire")] LockNotExpired,
    #[error("can only lock until time in the future")] UnlockTimeInPast,
    #[error("voting lock can be {max_secs} seconds max")] UnlockTimeTooFar { max_secs: u64 },
    #[error("can only increase lock duration")] UnlockTimeNotIncreased,
    #[error("global curve is {behind_buckets} buckets behind; checkpoint first")] CatchUpRequired { behind_buckets: u64 },
    #[error("clock went backwards: now {now} < last checkpoint {last}")] ClockWentBackwards { now: Timestamp, last: Timestamp },
    #[error("sequence {requested} is beyond the latest {latest}")] FutureSequence { requested: u64, latest: u64 },
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Access(#[from] AccessError),
    #[error(transparent)] Token(#[from] TokenError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GaugeError {
    #[error("category not found: {0}")] CategoryNotFound(u32),
    #[error("gauge already added")] TargetExists,
    #[error("gauge not added")] TargetNotFound,
    #[error("power out of range: {0} bps")] PowerOutOfRange(u64),
    #[error("used too much power: {used} > {budget}")] BudgetExceeded { used: u64, budget: u64 },
    #[error("cannot vote so often: next vote at {next_allowed}")] VoteCooldown { next_allowed: Timestamp },
    #[error("no voting power")] NoVotingPower,
    #[error("your token lock expires too soon")] LockExpiresTooSoon,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Access(#[from] AccessError),
    #[error(transparent)] Ledger(#[from] LedgerError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeeError {
    #[error("distributor unavailable")] Unavailable,
    #[error("zero address")] ZeroAddress,
    #[error("unsupported operation: {0}")] UnsupportedOperation(String),
    #[error("nothing to distribute")] NothingToDistribute,
    #[error("revenue checkpoint not allowed")] CheckpointNotAllowed,
    #[error("batch too large: {len} > {max}")] BatchTooLarge { len: usize, max: usize },
    #[error("cannot recover the revenue token")] ProtectedToken,
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error(transparent)] Access(#[from] AccessError),
    #[error(transparent)] Token(#[from] TokenError),
    #[error(transparent)] Ledger(#[from] LedgerError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    #[error("io: {0}")] Io(String),
    #[error("encode: {0}")] Encode(String),
    #[error("decode: {0}")] Decode(String),
    #[error("unsupported snapshot version {found}, expected {expected}")] Version { found: u16, expected: u16 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("config: {0}")]
pub struct ConfigError(pub String);

/// Umbrella error for callers driving several components.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaneError {
    #[error(transparent)] Access(#[from] AccessError),
    #[error(transparent)] Token(#[from] TokenError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Gauge(#[from] GaugeError),
    #[error(transparent)] Fee(#[from] FeeError),
    #[error(transparent)] Persist(#[from] PersistError),
    #[error(transparent)] Config(#[from] ConfigError),
}
