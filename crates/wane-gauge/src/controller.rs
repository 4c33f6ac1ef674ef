//! Gauge controller: vote-weighted allocation across targets and categories.
//!
//! Participants split a fixed budget of basis points across registered
//! targets. Each vote turns a share of the participant's escrow slope into a
//! weight line that starts at the next bucket and decays to zero at their
//! unlock time. Categories scale the summed weight of their targets; the
//! relative weight of a target is its share of the category-weighted total.
//!
//! Every change lands at the next bucket boundary, never the current one,
//! so the weights of a bucket that has already started are fixed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use wane_core::access::Ownership;
use wane_core::config::GaugeSettings;
use wane_core::constants::{POWER_SCALE, WEEK, WEIGHT_PRECISION};
use wane_core::error::GaugeError;
use wane_core::math::mul_div;
use wane_core::traits::VotingPower;
use wane_core::types::{AccountId, Amount, CategoryId, Timestamp, bucket_floor, next_bucket};

use crate::series::{BucketSeries, DecayingWeight, LevelWeight, WeightPoint};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
struct Category {
    name: String,
    weight: LevelWeight,
    /// Sum of the weights of every target in the category.
    sum: DecayingWeight,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
struct Target {
    category: CategoryId,
    weight: DecayingWeight,
}

/// A participant's standing vote on one target.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode,
    bincode::Decode,
)]
pub struct VoteRecord {
    /// Slope contributed to the target's weight line.
    pub slope: Amount,
    pub power_bps: u64,
    /// Bucket at which the contribution reaches zero.
    pub end: Timestamp,
    pub last_vote: Timestamp,
}

/// Total weight override used to price a pending change before it is applied.
#[derive(Clone, Copy)]
enum Pending {
    None,
    Sum(CategoryId, Amount),
    CategoryWeight(CategoryId, Amount),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct GaugeController {
    ownership: Ownership,
    settings: GaugeSettings,
    /// Index `i` holds category id `i + 1`.
    categories: Vec<Category>,
    targets: BTreeMap<AccountId, Target>,
    votes: BTreeMap<(AccountId, AccountId), VoteRecord>,
    power_used: BTreeMap<AccountId, u64>,
    totals: BucketSeries<Amount>,
    total_cursor: Timestamp,
}

impl GaugeController {
    pub fn new(admin: AccountId, settings: GaugeSettings, now: Timestamp) -> Result<Self, GaugeError> {
        Ok(Self {
            ownership: Ownership::new(admin)?,
            settings,
            categories: Vec::new(),
            targets: BTreeMap::new(),
            votes: BTreeMap::new(),
            power_used: BTreeMap::new(),
            totals: BucketSeries::new(),
            total_cursor: next_bucket(now),
        })
    }

    // --- registration ---

    /// Register a category with `weight` in force from the next bucket.
    /// Returns its 1-based id.
    pub fn add_category(
        &mut self,
        caller: &AccountId,
        name: &str,
        weight: Amount,
        now: Timestamp,
    ) -> Result<CategoryId, GaugeError> {
        self.ownership.ensure_admin(caller)?;
        self.checkpoint_total(now)?;
        let next = next_bucket(now);
        let id = CategoryId::try_from(self.categories.len() + 1).map_err(|_| GaugeError::ArithmeticOverflow)?;
        let mut level = LevelWeight::new();
        level.set(next, weight);
        self.categories.push(Category {
            name: name.to_string(),
            weight: level,
            sum: DecayingWeight::new(next),
        });
        info!(category = id, name, weight, "category added");
        Ok(id)
    }

    /// Register `target` under `category` with a constant admin weight (in
    /// voting-power units) from the next bucket.
    pub fn add_target(
        &mut self,
        caller: &AccountId,
        target: AccountId,
        category: CategoryId,
        weight: Amount,
        now: Timestamp,
    ) -> Result<(), GaugeError> {
        self.ownership.ensure_admin(caller)?;
        self.category(category)?;
        if self.targets.contains_key(&target) {
            return Err(GaugeError::TargetExists);
        }
        let scaled = weight.checked_mul(POWER_SCALE).ok_or(GaugeError::ArithmeticOverflow)?;
        self.checkpoint_total(now)?;
        let next = next_bucket(now);

        let sum = self.category(category)?.sum.value_at(next);
        let new_sum = sum.bias.checked_add(scaled).ok_or(GaugeError::ArithmeticOverflow)?;
        let total = self.total_with(next, Pending::Sum(category, new_sum))?;

        let mut line = DecayingWeight::new(next);
        line.set_point(next, WeightPoint { bias: scaled, slope: 0 });
        self.targets.insert(target, Target { category, weight: line });
        self.category_mut(category)?.sum.set_point(next, WeightPoint { bias: new_sum, slope: sum.slope });
        self.totals.set(next, total);

        info!(%target, category, weight, "target added");
        Ok(())
    }

    // --- admin weight changes ---

    pub fn change_category_weight(
        &mut self,
        caller: &AccountId,
        category: CategoryId,
        weight: Amount,
        now: Timestamp,
    ) -> Result<(), GaugeError> {
        self.ownership.ensure_admin(caller)?;
        self.category(category)?;
        self.checkpoint_total(now)?;
        let next = next_bucket(now);
        let total = self.total_with(next, Pending::CategoryWeight(category, weight))?;

        self.category_mut(category)?.weight.set(next, weight);
        self.totals.set(next, total);
        info!(category, weight, effective = next, "category weight changed");
        Ok(())
    }

    /// Replace the bias of `target`'s weight line from the next bucket.
    /// Vote slopes already scheduled keep running.
    pub fn change_target_weight(
        &mut self,
        caller: &AccountId,
        target: &AccountId,
        weight: Amount,
        now: Timestamp,
    ) -> Result<(), GaugeError> {
        self.ownership.ensure_admin(caller)?;
        let category = self.target(target)?.category;
        let scaled = weight.checked_mul(POWER_SCALE).ok_or(GaugeError::ArithmeticOverflow)?;
        self.checkpoint_target(target, now)?;
        self.checkpoint_total(now)?;
        let next = next_bucket(now);

        let old = self.target(target)?.weight.value_at(next);
        let sum = self.category(category)?.sum.value_at(next);
        let new_sum = sum
            .bias
            .checked_add(scaled)
            .ok_or(GaugeError::ArithmeticOverflow)?
            .saturating_sub(old.bias);
        let total = self.total_with(next, Pending::Sum(category, new_sum))?;

        self.target_mut(target)?.weight.set_point(next, WeightPoint { bias: scaled, slope: old.slope });
        self.category_mut(category)?.sum.set_point(next, WeightPoint { bias: new_sum, slope: sum.slope });
        self.totals.set(next, total);
        info!(%target, weight, effective = next, "target weight changed");
        Ok(())
    }

    // --- voting ---

    /// Allocate `power_bps` of `who`'s budget to `target`, replacing any
    /// earlier vote on it. `power_bps == 0` removes the vote.
    ///
    /// # Errors
    ///
    /// - [`GaugeError::TargetNotFound`] if `target` is not registered
    /// - [`GaugeError::PowerOutOfRange`] if `power_bps` exceeds the budget
    /// - [`GaugeError::NoVotingPower`] if `who` has no locked stake
    /// - [`GaugeError::LockExpiresTooSoon`] if the lock ends by the next bucket
    /// - [`GaugeError::VoteCooldown`] if `who` voted on `target` too recently
    /// - [`GaugeError::BudgetExceeded`] if the total allocation would exceed the budget
    pub fn vote(
        &mut self,
        escrow: &dyn VotingPower,
        who: &AccountId,
        target: &AccountId,
        power_bps: u64,
        now: Timestamp,
    ) -> Result<(), GaugeError> {
        let category = self.target(target)?.category;
        let budget = self.settings.vote_budget_bps;
        if power_bps > budget {
            return Err(GaugeError::PowerOutOfRange(power_bps));
        }
        let user_slope = escrow.user_slope(who);
        if user_slope == 0 {
            return Err(GaugeError::NoVotingPower);
        }
        let next = next_bucket(now);
        let lock_end = escrow.lock_end(who);
        if lock_end <= next {
            return Err(GaugeError::LockExpiresTooSoon);
        }
        let old = self.votes.get(&(*who, *target)).copied();
        if let Some(prev) = old {
            let next_allowed = prev.last_vote.saturating_add(self.settings.vote_cooldown_secs);
            if now < next_allowed {
                return Err(GaugeError::VoteCooldown { next_allowed });
            }
        }
        let old = old.unwrap_or_default();
        let used = self
            .power_used(who)
            .saturating_sub(old.power_bps)
            .saturating_add(power_bps);
        if used > budget {
            return Err(GaugeError::BudgetExceeded { used, budget });
        }

        let new_slope = mul_div(user_slope, power_bps as Amount, budget as Amount)
            .ok_or(GaugeError::ArithmeticOverflow)?;
        let new_bias = new_slope
            .checked_mul((lock_end - next) as Amount)
            .ok_or(GaugeError::ArithmeticOverflow)?;
        let old_bias = old.slope.saturating_mul(old.end.saturating_sub(next) as Amount);

        self.checkpoint_target(target, now)?;
        self.checkpoint_total(now)?;

        let line = self.target(target)?.weight.value_at(next);
        let sum = self.category(category)?.sum.value_at(next);
        let apply = |p: WeightPoint| -> Result<WeightPoint, GaugeError> {
            let bias = p
                .bias
                .checked_add(new_bias)
                .ok_or(GaugeError::ArithmeticOverflow)?
                .saturating_sub(old_bias);
            let slope = if old.end > next {
                p.slope
                    .checked_add(new_slope)
                    .ok_or(GaugeError::ArithmeticOverflow)?
                    .saturating_sub(old.slope)
            } else {
                p.slope.checked_add(new_slope).ok_or(GaugeError::ArithmeticOverflow)?
            };
            Ok(WeightPoint { bias, slope })
        };
        let line = apply(line)?;
        let sum = apply(sum)?;
        let total = self.total_with(next, Pending::Sum(category, sum.bias))?;

        {
            let t = self.target_mut(target)?;
            t.weight.set_point(next, line);
            if old.end > now {
                t.weight.cancel(old.end, old.slope);
            }
            t.weight.schedule(lock_end, new_slope);
        }
        {
            let c = self.category_mut(category)?;
            c.sum.set_point(next, sum);
            if old.end > now {
                c.sum.cancel(old.end, old.slope);
            }
            c.sum.schedule(lock_end, new_slope);
        }
        self.totals.set(next, total);
        self.power_used.insert(*who, used);
        self.votes.insert(
            (*who, *target),
            VoteRecord { slope: new_slope, power_bps, end: lock_end, last_vote: now },
        );

        debug!(%who, %target, power_bps, used, slope = new_slope, effective = next, "vote recorded");
        Ok(())
    }

    // --- checkpoints ---

    /// Materialise `target`'s weight line up to the next bucket.
    pub fn checkpoint_target(&mut self, target: &AccountId, now: Timestamp) -> Result<(), GaugeError> {
        self.target_mut(target)?.weight.catch_up(now);
        Ok(())
    }

    /// Materialise every category sum and the weighted total up to the next
    /// bucket. Returns the total in force at the next bucket.
    pub fn checkpoint_total(&mut self, now: Timestamp) -> Result<Amount, GaugeError> {
        for c in &mut self.categories {
            c.sum.catch_up(now);
        }
        let mut t = self.total_cursor;
        if t > now {
            // The upcoming bucket may have changed since it was last written.
            t = t.saturating_sub(WEEK);
        }
        let mut total = self.totals.get(t);
        while t <= now {
            t += WEEK;
            total = self.total_with(t, Pending::None)?;
            self.totals.set(t, total);
        }
        self.total_cursor = self.total_cursor.max(t);
        debug!(now, cursor = self.total_cursor, total, "total weight checkpoint");
        Ok(total)
    }

    /// `Σ category_weight × category_sum` at bucket `t`, with one pending
    /// change substituted.
    fn total_with(&self, t: Timestamp, pending: Pending) -> Result<Amount, GaugeError> {
        let mut total: Amount = 0;
        for (i, c) in self.categories.iter().enumerate() {
            let id = (i + 1) as CategoryId;
            let sum = match pending {
                Pending::Sum(cat, s) if cat == id => s,
                _ => c.sum.value_at(t).bias,
            };
            let weight = match pending {
                Pending::CategoryWeight(cat, w) if cat == id => w,
                _ => c.weight.value_at(t),
            };
            let term = sum.checked_mul(weight).ok_or(GaugeError::ArithmeticOverflow)?;
            total = total.checked_add(term).ok_or(GaugeError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    // --- reads ---

    /// Share of the total weight held by `target` during the bucket
    /// containing `t`, as a fraction of `WEIGHT_PRECISION`. Zero when the
    /// total is zero.
    pub fn relative_weight(&self, target: &AccountId, t: Timestamp) -> Result<Amount, GaugeError> {
        let entry = self.target(target)?;
        let bucket = bucket_floor(t);
        let total = self.total_weight(bucket)?;
        if total == 0 {
            return Ok(0);
        }
        let weight = entry.weight.value_at(bucket).bias;
        let category_weight = self.category(entry.category)?.weight.value_at(bucket);
        let numerator = weight.checked_mul(category_weight).ok_or(GaugeError::ArithmeticOverflow)?;
        mul_div(numerator, WEIGHT_PRECISION, total).ok_or(GaugeError::ArithmeticOverflow)
    }

    /// Checkpoint `target` and the total, then read its relative weight.
    pub fn relative_weight_write(
        &mut self,
        target: &AccountId,
        t: Timestamp,
        now: Timestamp,
    ) -> Result<Amount, GaugeError> {
        self.checkpoint_target(target, now)?;
        self.checkpoint_total(now)?;
        self.relative_weight(target, t)
    }

    /// Category-weighted total for the bucket containing `t`.
    pub fn total_weight(&self, t: Timestamp) -> Result<Amount, GaugeError> {
        let bucket = bucket_floor(t);
        if bucket <= self.total_cursor {
            return Ok(self.totals.get(bucket));
        }
        self.total_with(bucket, Pending::None)
    }

    /// Weight (bias) of `target` for the bucket containing `t`.
    pub fn target_weight(&self, target: &AccountId, t: Timestamp) -> Result<Amount, GaugeError> {
        Ok(self.target(target)?.weight.value_at(t).bias)
    }

    pub fn category_weight(&self, category: CategoryId, t: Timestamp) -> Result<Amount, GaugeError> {
        Ok(self.category(category)?.weight.value_at(t))
    }

    pub fn category_sum(&self, category: CategoryId, t: Timestamp) -> Result<Amount, GaugeError> {
        Ok(self.category(category)?.sum.value_at(t).bias)
    }

    pub fn category_name(&self, category: CategoryId) -> Result<&str, GaugeError> {
        Ok(&self.category(category)?.name)
    }

    pub fn category_of(&self, target: &AccountId) -> Result<CategoryId, GaugeError> {
        Ok(self.target(target)?.category)
    }

    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn targets(&self) -> impl Iterator<Item = &AccountId> {
        self.targets.keys()
    }

    pub fn power_used(&self, who: &AccountId) -> u64 {
        self.power_used.get(who).copied().unwrap_or(0)
    }

    pub fn vote_of(&self, who: &AccountId, target: &AccountId) -> Option<VoteRecord> {
        self.votes.get(&(*who, *target)).copied()
    }

    pub fn total_cursor(&self) -> Timestamp {
        self.total_cursor
    }

    pub fn settings(&self) -> &GaugeSettings {
        &self.settings
    }

    // --- admin ---

    pub fn admin(&self) -> AccountId {
        self.ownership.admin()
    }

    pub fn future_admin(&self) -> Option<AccountId> {
        self.ownership.future_admin()
    }

    pub fn commit_transfer_ownership(&mut self, caller: &AccountId, new_admin: AccountId) -> Result<(), GaugeError> {
        Ok(self.ownership.commit_transfer(caller, new_admin)?)
    }

    pub fn accept_transfer_ownership(&mut self, caller: &AccountId) -> Result<(), GaugeError> {
        Ok(self.ownership.accept_transfer(caller)?)
    }

    // --- lookups ---

    fn category(&self, id: CategoryId) -> Result<&Category, GaugeError> {
        id.checked_sub(1)
            .and_then(|i| self.categories.get(i as usize))
            .ok_or(GaugeError::CategoryNotFound(id))
    }

    fn category_mut(&mut self, id: CategoryId) -> Result<&mut Category, GaugeError> {
        id.checked_sub(1)
            .and_then(|i| self.categories.get_mut(i as usize))
            .ok_or(GaugeError::CategoryNotFound(id))
    }

    fn target(&self, target: &AccountId) -> Result<&Target, GaugeError> {
        self.targets.get(target).ok_or(GaugeError::TargetNotFound)
    }

    fn target_mut(&mut self, target: &AccountId) -> Result<&mut Target, GaugeError> {
        self.targets.get_mut(target).ok_or(GaugeError::TargetNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wane_core::constants::DAY;
    use wane_core::error::{AccessError, LedgerError};
    use wane_core::types::CatchUp;

    /// Fixed-slope stand-in for the escrow.
    #[derive(Default)]
    struct StubPower {
        locks: BTreeMap<AccountId, (Amount, Timestamp)>,
    }

    impl StubPower {
        fn with(who: AccountId, slope: Amount, end: Timestamp) -> Self {
            let mut s = Self::default();
            s.locks.insert(who, (slope, end));
            s
        }
    }

    impl VotingPower for StubPower {
        fn power_of(&self, who: &AccountId, t: Timestamp) -> Amount {
            self.locks.get(who).map_or(0, |(s, e)| s * e.saturating_sub(t) as Amount)
        }
        fn total_power_at(&self, t: Timestamp) -> Result<Amount, LedgerError> {
            Ok(self.locks.values().map(|(s, e)| s * e.saturating_sub(t) as Amount).sum())
        }
        fn user_slope(&self, who: &AccountId) -> Amount {
            self.locks.get(who).map_or(0, |(s, _)| *s)
        }
        fn lock_end(&self, who: &AccountId) -> Timestamp {
            self.locks.get(who).map_or(0, |(_, e)| *e)
        }
        fn first_checkpoint(&self, _who: &AccountId) -> Option<Timestamp> {
            Some(0)
        }
        fn checkpoint(&mut self, _now: Timestamp) -> Result<CatchUp, LedgerError> {
            Ok(CatchUp::Complete)
        }
    }

    fn acct(label: &str) -> AccountId {
        AccountId::derive(label)
    }

    fn admin() -> AccountId {
        acct("admin")
    }

    /// Controller at t=0 with one category (weight 1) and targets `a`, `b`.
    fn setup() -> GaugeController {
        let mut gc = GaugeController::new(admin(), GaugeSettings::default(), 0).unwrap();
        let cat = gc.add_category(&admin(), "liquidity", 1, 0).unwrap();
        gc.add_target(&admin(), acct("a"), cat, 0, 0).unwrap();
        gc.add_target(&admin(), acct("b"), cat, 0, 0).unwrap();
        gc
    }

    // --- registration ---

    #[test]
    fn categories_are_one_based() {
        let mut gc = GaugeController::new(admin(), GaugeSettings::default(), 0).unwrap();
        assert_eq!(gc.add_category(&admin(), "x", 1, 0), Ok(1));
        assert_eq!(gc.add_category(&admin(), "y", 2, 0), Ok(2));
        assert_eq!(gc.category_count(), 2);
        assert_eq!(gc.category_name(2), Ok("y"));
        assert_eq!(gc.category_weight(0, WEEK), Err(GaugeError::CategoryNotFound(0)));
        assert_eq!(
            gc.add_target(&admin(), acct("g"), 3, 0, 0),
            Err(GaugeError::CategoryNotFound(3))
        );
    }

    #[test]
    fn registration_is_admin_only() {
        let mut gc = setup();
        assert_eq!(
            gc.add_category(&acct("eve"), "z", 1, 0),
            Err(GaugeError::Access(AccessError::AdminOnly))
        );
        assert_eq!(
            gc.add_target(&acct("eve"), acct("c"), 1, 0, 0),
            Err(GaugeError::Access(AccessError::AdminOnly))
        );
    }

    #[test]
    fn target_cannot_be_added_twice() {
        let mut gc = setup();
        assert_eq!(gc.add_target(&admin(), acct("a"), 1, 0, 0), Err(GaugeError::TargetExists));
        assert_eq!(gc.target_count(), 2);
        assert_eq!(gc.category_of(&acct("a")), Ok(1));
    }

    #[test]
    fn admin_weight_takes_effect_next_bucket() {
        let mut gc = setup();
        gc.add_target(&admin(), acct("c"), 1, 10, WEEK + 5).unwrap();
        assert_eq!(gc.target_weight(&acct("c"), WEEK + 5), Ok(0));
        assert_eq!(gc.target_weight(&acct("c"), 2 * WEEK), Ok(10 * POWER_SCALE));
        assert_eq!(gc.relative_weight(&acct("c"), WEEK), Ok(0));
        assert_eq!(gc.relative_weight(&acct("c"), 2 * WEEK), Ok(WEIGHT_PRECISION));
        // Constant weight carries forward.
        assert_eq!(gc.relative_weight(&acct("c"), 9 * WEEK), Ok(WEIGHT_PRECISION));
    }

    // --- vote validation ---

    #[test]
    fn vote_rejects_unknown_target() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 50 * WEEK);
        assert_eq!(gc.vote(&vp, &acct("u"), &acct("zz"), 100, 0), Err(GaugeError::TargetNotFound));
    }

    #[test]
    fn vote_rejects_power_over_budget() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 50 * WEEK);
        assert_eq!(gc.vote(&vp, &acct("u"), &acct("a"), 10_001, 0), Err(GaugeError::PowerOutOfRange(10_001)));
    }

    #[test]
    fn vote_distinguishes_no_power_from_short_lock() {
        let mut gc = setup();
        let none = StubPower::default();
        assert_eq!(gc.vote(&none, &acct("u"), &acct("a"), 100, 0), Err(GaugeError::NoVotingPower));
        let short = StubPower::with(acct("u"), 100, WEEK);
        assert_eq!(gc.vote(&short, &acct("u"), &acct("a"), 100, 0), Err(GaugeError::LockExpiresTooSoon));
    }

    #[test]
    fn vote_budget_is_conserved() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 50 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 6_000, 0).unwrap();
        assert_eq!(
            gc.vote(&vp, &acct("u"), &acct("b"), 5_000, 0),
            Err(GaugeError::BudgetExceeded { used: 11_000, budget: 10_000 })
        );
        gc.vote(&vp, &acct("u"), &acct("b"), 4_000, 0).unwrap();
        assert_eq!(gc.power_used(&acct("u")), 10_000);
    }

    #[test]
    fn revote_respects_cooldown() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 50 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 5_000, 0).unwrap();
        assert_eq!(
            gc.vote(&vp, &acct("u"), &acct("a"), 1_000, DAY),
            Err(GaugeError::VoteCooldown { next_allowed: 10 * DAY })
        );
        // A different target is not rate-limited.
        gc.vote(&vp, &acct("u"), &acct("b"), 1_000, DAY).unwrap();
        gc.vote(&vp, &acct("u"), &acct("a"), 1_000, 10 * DAY).unwrap();
        assert_eq!(gc.power_used(&acct("u")), 2_000);
    }

    // --- vote effect ---

    #[test]
    fn vote_weight_starts_next_bucket() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 50 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 10_000, WEEK + 3).unwrap();
        assert_eq!(gc.target_weight(&acct("a"), WEEK + 3), Ok(0));
        assert_eq!(gc.target_weight(&acct("a"), 2 * WEEK), Ok(100 * 48 * WEEK as Amount));
        assert_eq!(gc.relative_weight(&acct("a"), WEEK), Ok(0));
        assert_eq!(gc.relative_weight(&acct("a"), 2 * WEEK), Ok(WEIGHT_PRECISION));
        let rec = gc.vote_of(&acct("u"), &acct("a")).unwrap();
        assert_eq!((rec.slope, rec.power_bps, rec.end, rec.last_vote), (100, 10_000, 50 * WEEK, WEEK + 3));
    }

    #[test]
    fn vote_weight_decays_to_zero_at_lock_end() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 5 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 10_000, 0).unwrap();
        assert_eq!(gc.target_weight(&acct("a"), 3 * WEEK), Ok(100 * 2 * WEEK as Amount));
        assert_eq!(gc.target_weight(&acct("a"), 5 * WEEK), Ok(0));
        assert_eq!(gc.relative_weight(&acct("a"), 6 * WEEK), Ok(0));
        gc.checkpoint_target(&acct("a"), 7 * WEEK).unwrap();
        gc.checkpoint_total(7 * WEEK).unwrap();
        assert_eq!(gc.total_weight(6 * WEEK), Ok(0));
    }

    #[test]
    fn split_vote_halves_relative_weight() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 100 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 10_000, 0).unwrap();
        assert_eq!(gc.relative_weight(&acct("a"), WEEK), Ok(WEIGHT_PRECISION));

        let t = 2 * WEEK + DAY;
        gc.vote(&vp, &acct("u"), &acct("a"), 5_000, t).unwrap();
        gc.vote(&vp, &acct("u"), &acct("b"), 5_000, t).unwrap();
        // The current bucket is unchanged.
        assert_eq!(gc.relative_weight(&acct("a"), t), Ok(WEIGHT_PRECISION));
        assert_eq!(gc.relative_weight(&acct("a"), 3 * WEEK), Ok(WEIGHT_PRECISION / 2));
        assert_eq!(gc.relative_weight(&acct("b"), 3 * WEEK), Ok(WEIGHT_PRECISION / 2));
    }

    #[test]
    fn zero_power_vote_removes_contribution() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 100 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 10_000, 0).unwrap();
        gc.vote(&vp, &acct("u"), &acct("a"), 0, 2 * WEEK).unwrap();
        assert_eq!(gc.target_weight(&acct("a"), 3 * WEEK), Ok(0));
        assert_eq!(gc.power_used(&acct("u")), 0);
        assert_eq!(gc.total_weight(3 * WEEK), Ok(0));
    }

    #[test]
    fn category_weight_scales_relative_weight() {
        let mut gc = setup();
        let cat2 = gc.add_category(&admin(), "staking", 3, 0).unwrap();
        gc.add_target(&admin(), acct("c"), cat2, 0, 0).unwrap();
        let mut vp = StubPower::with(acct("u"), 100, 100 * WEEK);
        vp.locks.insert(acct("v"), (100, 100 * WEEK));
        gc.vote(&vp, &acct("u"), &acct("a"), 10_000, 0).unwrap();
        gc.vote(&vp, &acct("v"), &acct("c"), 10_000, 0).unwrap();
        assert_eq!(gc.relative_weight(&acct("a"), WEEK), Ok(WEIGHT_PRECISION / 4));
        assert_eq!(gc.relative_weight(&acct("c"), WEEK), Ok(WEIGHT_PRECISION / 4 * 3));

        gc.change_category_weight(&admin(), cat2, 1, WEEK + 1).unwrap();
        assert_eq!(gc.relative_weight(&acct("c"), WEEK + 1), Ok(WEIGHT_PRECISION / 4 * 3));
        assert_eq!(gc.relative_weight(&acct("c"), 2 * WEEK), Ok(WEIGHT_PRECISION / 2));
        assert_eq!(gc.category_weight(cat2, 2 * WEEK), Ok(1));
    }

    #[test]
    fn change_target_weight_replaces_bias() {
        let mut gc = setup();
        gc.change_target_weight(&admin(), &acct("a"), 30, 0).unwrap();
        gc.change_target_weight(&admin(), &acct("b"), 10, 0).unwrap();
        assert_eq!(gc.relative_weight(&acct("a"), WEEK), Ok(WEIGHT_PRECISION / 4 * 3));
        gc.change_target_weight(&admin(), &acct("a"), 10, WEEK).unwrap();
        assert_eq!(gc.relative_weight(&acct("a"), WEEK), Ok(WEIGHT_PRECISION / 4 * 3));
        assert_eq!(gc.relative_weight(&acct("a"), 2 * WEEK), Ok(WEIGHT_PRECISION / 2));
        assert_eq!(gc.category_sum(1, 2 * WEEK), Ok(20 * POWER_SCALE));
    }

    #[test]
    fn relative_weight_zero_without_total() {
        let gc = setup();
        assert_eq!(gc.relative_weight(&acct("a"), 5 * WEEK), Ok(0));
        assert_eq!(gc.relative_weight(&acct("nope"), WEEK), Err(GaugeError::TargetNotFound));
    }

    #[test]
    fn relative_weight_write_materialises() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 100 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 10_000, 0).unwrap();
        let before = gc.relative_weight(&acct("a"), 4 * WEEK).unwrap();
        let written = gc.relative_weight_write(&acct("a"), 4 * WEEK, 4 * WEEK).unwrap();
        assert_eq!(before, written);
        assert_eq!(gc.total_cursor(), 5 * WEEK);
    }

    #[test]
    fn ownership_handoff() {
        let mut gc = setup();
        gc.commit_transfer_ownership(&admin(), acct("next")).unwrap();
        gc.accept_transfer_ownership(&acct("next")).unwrap();
        assert_eq!(gc.admin(), acct("next"));
        assert_eq!(gc.future_admin(), Some(acct("next")));
        assert!(gc.add_category(&admin(), "late", 1, 0).is_err());
    }

    #[test]
    fn snapshot_round_trip() {
        let mut gc = setup();
        let vp = StubPower::with(acct("u"), 100, 100 * WEEK);
        gc.vote(&vp, &acct("u"), &acct("a"), 7_000, 0).unwrap();
        let bytes = wane_core::persist::encode_snapshot(&gc).unwrap();
        let back: GaugeController = wane_core::persist::decode_snapshot(&bytes).unwrap();
        assert_eq!(back, gc);
        assert_eq!(back.relative_weight(&acct("a"), 3 * WEEK), gc.relative_weight(&acct("a"), 3 * WEEK));
    }

    proptest! {
        #[test]
        fn power_used_matches_recorded_votes(
            ops in prop::collection::vec((0usize..3, 0u64..6_000, 0u64..20), 1..30),
        ) {
            let mut gc = setup();
            gc.add_target(&admin(), acct("c"), 1, 0, 0).unwrap();
            let targets = [acct("a"), acct("b"), acct("c")];
            let vp = StubPower::with(acct("u"), 1_000, 200 * WEEK);
            let mut now = 0;
            for (idx, bps, days) in ops {
                now += days * DAY;
                let _ = gc.vote(&vp, &acct("u"), &targets[idx], bps, now);
                let used = gc.power_used(&acct("u"));
                let recorded: u64 = targets
                    .iter()
                    .filter_map(|t| gc.vote_of(&acct("u"), t))
                    .map(|r| r.power_bps)
                    .sum();
                prop_assert!(used <= 10_000);
                prop_assert_eq!(used, recorded);
            }
        }
    }
}
