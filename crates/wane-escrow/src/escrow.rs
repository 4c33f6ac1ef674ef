//! The vote-escrow ledger.
//!
//! [`VotingEscrow`] owns every participant's lock, the per-participant and
//! global point histories, and the slope-change schedule. It is a single
//! owned aggregate: every operation takes `&mut self` (or `&self` for reads)
//! plus the caller-supplied clock `now`, and either applies completely or
//! returns an error with no state touched.
//!
//! The global curve is advanced lazily, one bucket at a time, by every
//! mutating call. A single call walks at most `catch_up_limit` buckets;
//! lock operations refuse to run when the curve is further behind and the
//! caller must [`checkpoint`](VotingEscrow::checkpoint) first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wane_core::access::Ownership;
use wane_core::config::EscrowSettings;
use wane_core::constants::{MAX_LOCK_DURATION, WEEK};
use wane_core::error::{LedgerError, TokenError};
use wane_core::ledger::TokenLedger;
use wane_core::math::to_power;
use wane_core::traits::VotingPower;
use wane_core::types::{
    AccountId, Amount, CatchUp, Timestamp, TokenId, bucket_floor, buckets_between,
};

use crate::history::{PointHistory, SlopeSchedule};
use crate::point::{LockedBalance, Point};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct VotingEscrow {
    ownership: Ownership,
    /// Stake token locked by participants.
    token: TokenId,
    /// Account that holds locked stake on the token ledger.
    account: AccountId,
    settings: EscrowSettings,
    locks: BTreeMap<AccountId, LockedBalance>,
    user_history: BTreeMap<AccountId, PointHistory>,
    global: PointHistory,
    schedule: SlopeSchedule,
    total_locked: Amount,
    sequence: u64,
}

/// A validated lock change, ready to commit.
struct LockChange {
    who: AccountId,
    old: LockedBalance,
    new: LockedBalance,
    old_curve: (Amount, Amount),
    new_curve: (Amount, Amount),
    total_locked: Amount,
}

impl VotingEscrow {
    /// Create an escrow whose global history starts at `now`.
    pub fn new(
        admin: AccountId,
        token: TokenId,
        account: AccountId,
        settings: EscrowSettings,
        now: Timestamp,
    ) -> Result<Self, LedgerError> {
        if account.is_zero() {
            return Err(TokenError::ZeroAddress.into());
        }
        Ok(Self {
            ownership: Ownership::new(admin)?,
            token,
            account,
            settings,
            locks: BTreeMap::new(),
            user_history: BTreeMap::new(),
            global: PointHistory::with_origin(Point::new(0, 0, now, 0)),
            schedule: SlopeSchedule::new(),
            total_locked: 0,
            sequence: 0,
        })
    }

    // --- lock lifecycle ---

    /// Lock `amount` of the stake token until `unlock_time` (floored to the
    /// bucket grid).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::LockExists`] if `who` already holds stake
    /// - [`LedgerError::UnlockTimeInPast`] if the floored time is not after `now`
    /// - [`LedgerError::UnlockTimeTooFar`] if it exceeds `now + MAX_LOCK_DURATION`
    pub fn create_lock(
        &mut self,
        ledger: &mut dyn TokenLedger,
        who: &AccountId,
        amount: Amount,
        unlock_time: Timestamp,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let old = self.locked(who);
        if !old.is_empty() {
            return Err(LedgerError::LockExists);
        }
        let end = validate_unlock_time(unlock_time, now)?;
        self.ensure_current(now)?;

        let change = self.prepare_change(*who, old, LockedBalance::new(amount, end), now)?;
        ledger.transfer_from(self.token, &self.account, who, &self.account, amount)?;
        self.commit(change, now);

        info!(%who, amount, unlock_time = end, "lock created");
        Ok(())
    }

    /// Add `amount` to the caller's own lock without changing its end.
    pub fn increase_amount(
        &mut self,
        ledger: &mut dyn TokenLedger,
        who: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.deposit_for(ledger, who, who, amount, now)
    }

    /// Add `amount` to `who`'s lock, funded by `funder`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::ZeroAmount`] if `amount` is zero
    /// - [`LedgerError::NoLock`] if `who` has nothing locked
    /// - [`LedgerError::LockExpired`] if the lock already reached its end
    pub fn deposit_for(
        &mut self,
        ledger: &mut dyn TokenLedger,
        funder: &AccountId,
        who: &AccountId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let old = self.locked(who);
        if old.is_empty() {
            return Err(LedgerError::NoLock);
        }
        if old.is_expired(now) {
            return Err(LedgerError::LockExpired);
        }
        self.ensure_current(now)?;

        let total = old.amount.checked_add(amount).ok_or(LedgerError::ArithmeticOverflow)?;
        let change = self.prepare_change(*who, old, LockedBalance::new(total, old.end), now)?;
        ledger.transfer_from(self.token, &self.account, funder, &self.account, amount)?;
        self.commit(change, now);

        info!(%who, %funder, amount, locked = total, "lock amount increased");
        Ok(())
    }

    /// Move the end of `who`'s lock to `unlock_time` (floored to the bucket
    /// grid).
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NoLock`] if `who` has nothing locked
    /// - [`LedgerError::LockExpired`] if the lock already reached its end
    /// - [`LedgerError::UnlockTimeNotIncreased`] if the new end is not later
    /// - [`LedgerError::UnlockTimeTooFar`] if it exceeds `now + MAX_LOCK_DURATION`
    pub fn increase_unlock_time(
        &mut self,
        who: &AccountId,
        unlock_time: Timestamp,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let old = self.locked(who);
        if old.is_empty() {
            return Err(LedgerError::NoLock);
        }
        if old.is_expired(now) {
            return Err(LedgerError::LockExpired);
        }
        let end = bucket_floor(unlock_time);
        if end <= old.end {
            return Err(LedgerError::UnlockTimeNotIncreased);
        }
        validate_unlock_time(unlock_time, now)?;
        self.ensure_current(now)?;

        let change = self.prepare_change(*who, old, LockedBalance::new(old.amount, end), now)?;
        self.commit(change, now);

        info!(%who, old_end = old.end, unlock_time = end, "lock extended");
        Ok(())
    }

    /// Return all stake to `who` once the lock has expired.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NoLock`] if `who` has nothing locked
    /// - [`LedgerError::LockNotExpired`] if `now` is before the unlock time
    pub fn withdraw(
        &mut self,
        ledger: &mut dyn TokenLedger,
        who: &AccountId,
        now: Timestamp,
    ) -> Result<Amount, LedgerError> {
        let old = self.locked(who);
        if old.is_empty() {
            return Err(LedgerError::NoLock);
        }
        if !old.is_expired(now) {
            return Err(LedgerError::LockNotExpired);
        }
        self.release(ledger, who, old, now)?;
        info!(%who, amount = old.amount, "lock withdrawn");
        Ok(old.amount)
    }

    /// Admin override: zero `who`'s lock before its natural end and return
    /// the stake to them.
    pub fn force_expire(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &AccountId,
        who: &AccountId,
        now: Timestamp,
    ) -> Result<Amount, LedgerError> {
        self.ownership.ensure_admin(caller)?;
        let old = self.locked(who);
        if old.is_empty() {
            return Err(LedgerError::NoLock);
        }
        self.release(ledger, who, old, now)?;
        info!(%who, amount = old.amount, original_end = old.end, "lock force-expired");
        Ok(old.amount)
    }

    fn release(
        &mut self,
        ledger: &mut dyn TokenLedger,
        who: &AccountId,
        old: LockedBalance,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.ensure_current(now)?;
        let change = self.prepare_change(*who, old, LockedBalance::default(), now)?;
        ledger.transfer(self.token, &self.account, who, old.amount)?;
        self.commit(change, now);
        Ok(())
    }

    // --- global curve ---

    /// Advance the global curve towards `now` by at most `catch_up_limit`
    /// buckets. Touches no individual lock.
    pub fn checkpoint(&mut self, now: Timestamp) -> Result<CatchUp, LedgerError> {
        self.ensure_monotonic(now)?;
        self.sequence += 1;
        let outcome = self.advance_global(now, self.settings.catch_up_limit);
        match outcome {
            CatchUp::Complete => debug!(now, seq = self.sequence, "global checkpoint"),
            CatchUp::Partial { reached } => {
                warn!(now, reached, seq = self.sequence, "global checkpoint stopped short")
            }
        }
        Ok(outcome)
    }

    fn ensure_monotonic(&self, now: Timestamp) -> Result<Timestamp, LedgerError> {
        let last = self.latest_global().ts;
        if now < last {
            return Err(LedgerError::ClockWentBackwards { now, last });
        }
        Ok(last)
    }

    /// Reject lock operations whose global walk would exceed the cap.
    fn ensure_current(&self, now: Timestamp) -> Result<(), LedgerError> {
        let last = self.ensure_monotonic(now)?;
        let behind = buckets_between(last, now);
        if behind >= self.settings.catch_up_limit {
            return Err(LedgerError::CatchUpRequired { behind_buckets: behind });
        }
        Ok(())
    }

    /// Walk the global curve bucket by bucket up to `now`, recording a point
    /// at every boundary and consuming due schedule entries.
    fn advance_global(&mut self, now: Timestamp, limit: u64) -> CatchUp {
        let mut last = *self.latest_global();
        let mut t_i = bucket_floor(last.ts);
        for _ in 0..limit {
            t_i = t_i.saturating_add(WEEK);
            let d_slope = if t_i > now {
                t_i = now;
                0
            } else {
                self.schedule.take(t_i)
            };
            let dt = (t_i - last.ts) as Amount;
            last.bias = last.bias.saturating_sub(last.slope.saturating_mul(dt));
            last.slope = last.slope.saturating_sub(d_slope);
            last.ts = t_i;
            last.seq = self.sequence;
            self.global.record(last);
            if t_i == now {
                return CatchUp::Complete;
            }
        }
        CatchUp::Partial { reached: last.ts }
    }

    fn latest_global(&self) -> &Point {
        // The origin point is written at construction and histories only grow.
        static ORIGIN: Point = Point { bias: 0, slope: 0, ts: 0, seq: 0 };
        self.global.latest().unwrap_or(&ORIGIN)
    }

    // --- change application ---

    fn prepare_change(
        &self,
        who: AccountId,
        old: LockedBalance,
        new: LockedBalance,
        now: Timestamp,
    ) -> Result<LockChange, LedgerError> {
        let total_locked = self
            .total_locked
            .checked_sub(old.amount)
            .and_then(|t| t.checked_add(new.amount))
            .ok_or(LedgerError::ArithmeticOverflow)?;
        Ok(LockChange {
            who,
            old,
            new,
            old_curve: old.curve(now)?,
            new_curve: new.curve(now)?,
            total_locked,
        })
    }

    fn commit(&mut self, change: LockChange, now: Timestamp) {
        self.sequence += 1;
        let seq = self.sequence;
        // ensure_current guarantees this completes.
        let outcome = self.advance_global(now, self.settings.catch_up_limit);
        debug_assert!(outcome.is_complete());

        let (old_slope, old_bias) = change.old_curve;
        let (new_slope, new_bias) = change.new_curve;

        let mut tail = *self.latest_global();
        tail.slope = tail.slope.saturating_add(new_slope).saturating_sub(old_slope);
        tail.bias = tail.bias.saturating_add(new_bias).saturating_sub(old_bias);
        tail.ts = now;
        tail.seq = seq;
        self.global.record(tail);

        if change.old.end > now {
            self.schedule.cancel(change.old.end, old_slope);
        }
        if change.new.end > now {
            self.schedule.add(change.new.end, new_slope);
        }

        self.user_history
            .entry(change.who)
            .or_default()
            .record(Point::new(new_bias, new_slope, now, seq));
        if change.new.is_empty() {
            self.locks.remove(&change.who);
        } else {
            self.locks.insert(change.who, change.new);
        }

        self.total_locked = change.total_locked;

        debug!(who = %change.who, seq, slope = new_slope, bias = new_bias, "user checkpoint");
    }

    // --- queries ---

    /// Decayed power of `who` at `t`, scaled by `MAX_LOCK_DURATION`.
    pub fn power_of(&self, who: &AccountId, t: Timestamp) -> Amount {
        self.user_history
            .get(who)
            .and_then(|h| h.find_at_time(t))
            .map_or(0, |p| p.value_at(t))
    }

    /// Decayed total supply at `t`, scaled by `MAX_LOCK_DURATION`.
    ///
    /// Replays scheduled slope changes after the latest recorded global
    /// point, at most `catch_up_limit` buckets.
    pub fn total_power_at(&self, t: Timestamp) -> Result<Amount, LedgerError> {
        let Some(start) = self.global.find_at_time(t) else {
            return Ok(0);
        };
        let mut last = *start;
        let mut t_i = bucket_floor(last.ts);
        for _ in 0..self.settings.catch_up_limit {
            t_i = t_i.saturating_add(WEEK);
            let d_slope = if t_i > t {
                t_i = t;
                0
            } else {
                self.schedule.get(t_i)
            };
            let dt = (t_i - last.ts) as Amount;
            last.bias = last.bias.saturating_sub(last.slope.saturating_mul(dt));
            if t_i == t || last.bias == 0 {
                return Ok(last.bias);
            }
            last.slope = last.slope.saturating_sub(d_slope);
            last.ts = t_i;
        }
        Err(LedgerError::CatchUpRequired { behind_buckets: buckets_between(start.ts, t) })
    }

    /// Power of `who` as of global sequence position `seq`.
    ///
    /// Histories keep one point per timestamp, tagged with the earliest
    /// sequence written there, so `seq` resolves to the final state recorded
    /// at the timestamp of that call.
    pub fn power_of_at_index(&self, who: &AccountId, seq: u64) -> Result<Amount, LedgerError> {
        if seq > self.sequence {
            return Err(LedgerError::FutureSequence { requested: seq, latest: self.sequence });
        }
        let Some(global) = self.global.find_at_seq(seq) else {
            return Ok(0);
        };
        Ok(self
            .user_history
            .get(who)
            .and_then(|h| h.find_at_seq(seq))
            .map_or(0, |p| p.value_at(global.ts)))
    }

    /// Total supply as of global sequence position `seq`.
    pub fn total_power_at_index(&self, seq: u64) -> Result<Amount, LedgerError> {
        if seq > self.sequence {
            return Err(LedgerError::FutureSequence { requested: seq, latest: self.sequence });
        }
        Ok(self.global.find_at_seq(seq).map_or(0, |p| p.bias))
    }

    /// [`power_of`](Self::power_of) in stake-token units.
    pub fn voting_balance(&self, who: &AccountId, t: Timestamp) -> Amount {
        to_power(self.power_of(who, t))
    }

    /// [`total_power_at`](Self::total_power_at) in stake-token units.
    pub fn voting_supply(&self, t: Timestamp) -> Result<Amount, LedgerError> {
        self.total_power_at(t).map(to_power)
    }

    pub fn locked(&self, who: &AccountId) -> LockedBalance {
        self.locks.get(who).copied().unwrap_or_default()
    }

    pub fn lock_end(&self, who: &AccountId) -> Timestamp {
        self.locked(who).end
    }

    pub fn user_point_count(&self, who: &AccountId) -> usize {
        self.user_history.get(who).map_or(0, PointHistory::len)
    }

    pub fn user_point(&self, who: &AccountId, index: usize) -> Option<Point> {
        self.user_history.get(who).and_then(|h| h.get(index)).copied()
    }

    pub fn latest_user_point(&self, who: &AccountId) -> Option<Point> {
        self.user_history.get(who).and_then(|h| h.latest()).copied()
    }

    pub fn global_point(&self, index: usize) -> Option<Point> {
        self.global.get(index).copied()
    }

    pub fn global_point_count(&self) -> usize {
        self.global.len()
    }

    pub fn latest_global_point(&self) -> Point {
        *self.latest_global()
    }

    pub fn scheduled_slope_change(&self, t: Timestamp) -> Amount {
        self.schedule.get(t)
    }

    pub fn total_locked(&self) -> Amount {
        self.total_locked
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn token(&self) -> TokenId {
        self.token
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn settings(&self) -> &EscrowSettings {
        &self.settings
    }

    // --- admin ---

    pub fn admin(&self) -> AccountId {
        self.ownership.admin()
    }

    pub fn future_admin(&self) -> Option<AccountId> {
        self.ownership.future_admin()
    }

    pub fn commit_transfer_ownership(&mut self, caller: &AccountId, new_admin: AccountId) -> Result<(), LedgerError> {
        Ok(self.ownership.commit_transfer(caller, new_admin)?)
    }

    pub fn accept_transfer_ownership(&mut self, caller: &AccountId) -> Result<(), LedgerError> {
        Ok(self.ownership.accept_transfer(caller)?)
    }
}

fn validate_unlock_time(unlock_time: Timestamp, now: Timestamp) -> Result<Timestamp, LedgerError> {
    let end = bucket_floor(unlock_time);
    if end <= now {
        return Err(LedgerError::UnlockTimeInPast);
    }
    if end > now.saturating_add(MAX_LOCK_DURATION) {
        return Err(LedgerError::UnlockTimeTooFar { max_secs: MAX_LOCK_DURATION });
    }
    Ok(end)
}

impl VotingPower for VotingEscrow {
    fn power_of(&self, who: &AccountId, t: Timestamp) -> Amount {
        VotingEscrow::power_of(self, who, t)
    }

    fn total_power_at(&self, t: Timestamp) -> Result<Amount, LedgerError> {
        VotingEscrow::total_power_at(self, t)
    }

    fn user_slope(&self, who: &AccountId) -> Amount {
        self.latest_user_point(who).map_or(0, |p| p.slope)
    }

    fn lock_end(&self, who: &AccountId) -> Timestamp {
        VotingEscrow::lock_end(self, who)
    }

    fn first_checkpoint(&self, who: &AccountId) -> Option<Timestamp> {
        self.user_history.get(who).and_then(|h| h.first()).map(|p| p.ts)
    }

    fn checkpoint(&mut self, now: Timestamp) -> Result<CatchUp, LedgerError> {
        VotingEscrow::checkpoint(self, now)
    }
}
