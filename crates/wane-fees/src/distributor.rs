//! Epoch snapshot fee distributor.
//!
//! Revenue that reaches the distributor's account is spread over the weekly
//! buckets elapsed since the previous revenue checkpoint, pro rata by time.
//! Separately, the escrow's total voting power is snapshotted at the start of
//! every bucket. A participant's share of a bucket's revenue is their voting
//! power at the bucket start over the snapshot total.
//!
//! Lifecycle: `Uninitialized` until the first deposit, then `Running`, then
//! `Killed` (terminal) once the admin sweeps the balances away.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use wane_core::access::Ownership;
use wane_core::config::DistributorSettings;
use wane_core::constants::WEEK;
use wane_core::error::FeeError;
use wane_core::ledger::TokenLedger;
use wane_core::math::mul_div;
use wane_core::traits::VotingPower;
use wane_core::types::{AccountId, Amount, Timestamp, TokenId, bucket_ceil, bucket_floor};

use crate::intake::{DepositAmount, RevenueIntake};

#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, bincode::Encode,
    bincode::Decode,
)]
pub enum DistributorStatus {
    #[default]
    Uninitialized,
    Running,
    Killed,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct FeeDistributor {
    ownership: Ownership,
    settings: DistributorSettings,
    /// Token paid out to participants.
    token: TokenId,
    /// Account that holds undistributed and unclaimed revenue.
    account: AccountId,
    intake: RevenueIntake,
    status: DistributorStatus,
    start_time: Timestamp,
    /// Revenue checkpoint state.
    last_token_time: Timestamp,
    token_last_balance: Amount,
    dust: Amount,
    tokens_per_bucket: BTreeMap<Timestamp, Amount>,
    /// Voting-power snapshots; every bucket before `time_cursor` is recorded.
    time_cursor: Timestamp,
    supply: BTreeMap<Timestamp, Amount>,
    /// Next unclaimed bucket per participant.
    claim_cursors: BTreeMap<AccountId, Timestamp>,
}

impl FeeDistributor {
    /// Create a distributor whose first bucket is the one containing `now`.
    pub fn new(
        admin: AccountId,
        token: TokenId,
        account: AccountId,
        intake: RevenueIntake,
        settings: DistributorSettings,
        now: Timestamp,
    ) -> Result<Self, FeeError> {
        if account.is_zero() {
            return Err(FeeError::ZeroAddress);
        }
        if intake.input_token() == Some(token) {
            return Err(FeeError::UnsupportedOperation("reserve input equals revenue token".into()));
        }
        let start = bucket_floor(now);
        Ok(Self {
            ownership: Ownership::new(admin)?,
            settings,
            token,
            account,
            intake,
            status: DistributorStatus::Uninitialized,
            start_time: start,
            last_token_time: start,
            token_last_balance: 0,
            dust: 0,
            tokens_per_bucket: BTreeMap::new(),
            time_cursor: start,
            supply: BTreeMap::new(),
            claim_cursors: BTreeMap::new(),
        })
    }

    // --- revenue intake ---

    /// Settle revenue already held by the distributor through its intake.
    /// Returns the revenue-token amount produced.
    ///
    /// # Errors
    ///
    /// - [`FeeError::Unavailable`] once killed
    /// - [`FeeError::UnsupportedOperation`] if the intake cannot settle `token`
    /// - [`FeeError::NothingToDistribute`] if there is nothing to settle
    pub fn deposit_revenue(
        &mut self,
        ledger: &mut dyn TokenLedger,
        token: TokenId,
        amount: DepositAmount,
        now: Timestamp,
    ) -> Result<Amount, FeeError> {
        self.ensure_active()?;
        let settled = self.intake.distribute(ledger, token, &self.account, self.token, amount)?;
        self.mark_running();
        if self.public_checkpoint_due(now) {
            self.checkpoint_token(ledger, now)?;
        }
        info!(%token, settled, "revenue deposited");
        Ok(settled)
    }

    /// Pull the whole revenue-token balance of `sender` (which must be
    /// approved) into the distributor. Zero balance is a no-op.
    pub fn deposit_from(
        &mut self,
        ledger: &mut dyn TokenLedger,
        sender: &AccountId,
        now: Timestamp,
    ) -> Result<Amount, FeeError> {
        self.ensure_active()?;
        let amount = ledger.balance_of(self.token, sender);
        if amount == 0 {
            return Ok(0);
        }
        ledger.transfer_from(self.token, &self.account, sender, &self.account, amount)?;
        self.mark_running();
        if self.public_checkpoint_due(now) {
            self.checkpoint_token(ledger, now)?;
        }
        info!(%sender, amount, "revenue pulled");
        Ok(amount)
    }

    fn mark_running(&mut self) {
        if self.status == DistributorStatus::Uninitialized {
            self.status = DistributorStatus::Running;
            info!(start = self.start_time, "distributor running");
        }
    }

    // --- checkpoints ---

    /// Spread revenue received since the last revenue checkpoint over the
    /// buckets it covers. Returns the amount newly assigned to buckets.
    ///
    /// # Errors
    ///
    /// - [`FeeError::Unavailable`] once killed
    /// - [`FeeError::CheckpointNotAllowed`] for a non-admin caller unless
    ///   public checkpoints are enabled and the deadline has passed
    pub fn checkpoint_revenue(
        &mut self,
        ledger: &dyn TokenLedger,
        caller: &AccountId,
        now: Timestamp,
    ) -> Result<Amount, FeeError> {
        self.ensure_active()?;
        if !self.ownership.is_admin(caller) && !self.public_checkpoint_due(now) {
            return Err(FeeError::CheckpointNotAllowed);
        }
        if self.status == DistributorStatus::Uninitialized {
            return Ok(0);
        }
        self.checkpoint_token(ledger, now)
    }

    fn public_checkpoint_due(&self, now: Timestamp) -> bool {
        self.settings.public_revenue_checkpoint
            && now > self.last_token_time.saturating_add(self.settings.checkpoint_deadline_secs)
    }

    fn checkpoint_token(&mut self, ledger: &dyn TokenLedger, now: Timestamp) -> Result<Amount, FeeError> {
        let balance = ledger.balance_of(self.token, &self.account);
        let to_distribute = balance
            .saturating_sub(self.token_last_balance)
            .checked_add(self.dust)
            .ok_or(FeeError::ArithmeticOverflow)?;
        let start = self.last_token_time;
        let since_last = now.saturating_sub(start);

        let mut allocations: Vec<(Timestamp, Amount)> = Vec::new();
        let mut assigned: Amount = 0;
        let mut t = start;
        let mut this_bucket = bucket_floor(t);
        let mut reached = now;
        for i in 0..=self.settings.catch_up_limit {
            if i == self.settings.catch_up_limit {
                reached = t;
                break;
            }
            let next_bucket = this_bucket + WEEK;
            let end = next_bucket.min(now);
            let share = if since_last == 0 {
                to_distribute
            } else {
                mul_div(to_distribute, (end - t) as Amount, since_last as Amount)
                    .ok_or(FeeError::ArithmeticOverflow)?
            };
            let total = self
                .tokens_per_bucket
                .get(&this_bucket)
                .copied()
                .unwrap_or(0)
                .checked_add(share)
                .ok_or(FeeError::ArithmeticOverflow)?;
            allocations.push((this_bucket, total));
            assigned += share;
            if now < next_bucket {
                break;
            }
            t = next_bucket;
            this_bucket = next_bucket;
        }

        for (bucket, total) in allocations {
            self.tokens_per_bucket.insert(bucket, total);
        }
        self.dust = to_distribute - assigned;
        self.token_last_balance = balance;
        self.last_token_time = reached;

        if reached < now {
            warn!(now, reached, carried = self.dust, "revenue checkpoint stopped short");
        } else {
            debug!(now, assigned, dust = self.dust, "revenue checkpoint");
        }
        Ok(assigned)
    }

    /// Snapshot total voting power at the start of every bucket that began
    /// before `now`, at most `catch_up_limit` buckets per call.
    ///
    /// A bucket starting exactly at `now` stays open: locks written later
    /// at the same instant still count towards it.
    pub fn checkpoint_voting_power(
        &mut self,
        escrow: &mut dyn VotingPower,
        now: Timestamp,
    ) -> Result<(), FeeError> {
        self.ensure_active()?;
        self.checkpoint_total_supply(escrow, now)
    }

    fn checkpoint_total_supply(&mut self, escrow: &mut dyn VotingPower, now: Timestamp) -> Result<(), FeeError> {
        escrow.checkpoint(now)?;
        let mut t = self.time_cursor;
        let mut snapshots = Vec::new();
        for _ in 0..self.settings.catch_up_limit {
            if t >= now {
                break;
            }
            snapshots.push((t, escrow.total_power_at(t)?));
            t += WEEK;
        }
        let recorded = snapshots.len();
        self.supply.extend(snapshots);
        self.time_cursor = t;
        debug!(now, recorded, cursor = t, "voting power checkpoint");
        Ok(())
    }

    // --- claims ---

    /// Pay `who` (or `recipient`) their share of every fully distributed
    /// bucket since their last claim, walking at most `claim_bucket_limit`
    /// buckets. Nothing to claim is not an error.
    ///
    /// # Errors
    ///
    /// - [`FeeError::Unavailable`] once killed
    /// - [`FeeError::ZeroAddress`] if `recipient` is the zero address
    pub fn claim(
        &mut self,
        ledger: &mut dyn TokenLedger,
        escrow: &mut dyn VotingPower,
        who: &AccountId,
        recipient: Option<AccountId>,
        now: Timestamp,
    ) -> Result<Amount, FeeError> {
        self.ensure_active()?;
        let recipient = recipient.unwrap_or(*who);
        if recipient.is_zero() {
            return Err(FeeError::ZeroAddress);
        }
        if self.status == DistributorStatus::Uninitialized {
            return Ok(0);
        }
        self.prepare_claims(ledger, escrow, now)?;
        self.claim_one(ledger, escrow, who, &recipient)
    }

    /// Claim for each entry of `participants`, paying each to themselves.
    /// Zero-address entries are skipped. Returns the total paid.
    pub fn claim_many(
        &mut self,
        ledger: &mut dyn TokenLedger,
        escrow: &mut dyn VotingPower,
        participants: &[AccountId],
        now: Timestamp,
    ) -> Result<Amount, FeeError> {
        self.ensure_active()?;
        let max = self.settings.claim_batch_limit;
        if participants.len() > max {
            return Err(FeeError::BatchTooLarge { len: participants.len(), max });
        }
        if self.status == DistributorStatus::Uninitialized {
            return Ok(0);
        }
        self.prepare_claims(ledger, escrow, now)?;
        let mut total: Amount = 0;
        for who in participants.iter().filter(|p| !p.is_zero()) {
            let paid = self.claim_one(ledger, escrow, who, who)?;
            total = total.saturating_add(paid);
        }
        Ok(total)
    }

    fn prepare_claims(
        &mut self,
        ledger: &dyn TokenLedger,
        escrow: &mut dyn VotingPower,
        now: Timestamp,
    ) -> Result<(), FeeError> {
        if now > self.time_cursor {
            self.checkpoint_total_supply(escrow, now)?;
        }
        if self.public_checkpoint_due(now) {
            self.checkpoint_token(ledger, now)?;
        }
        Ok(())
    }

    fn claim_one(
        &mut self,
        ledger: &mut dyn TokenLedger,
        escrow: &dyn VotingPower,
        who: &AccountId,
        recipient: &AccountId,
    ) -> Result<Amount, FeeError> {
        let Some((amount, cursor)) = self.compute_claim(escrow, who, |t| self.supply.get(&t).copied())?
        else {
            return Ok(0);
        };
        if amount > 0 {
            ledger.transfer(self.token, &self.account, recipient, amount)?;
            self.token_last_balance = self.token_last_balance.saturating_sub(amount);
        }
        self.claim_cursors.insert(*who, cursor);
        debug!(%who, %recipient, amount, cursor, "fees claimed");
        Ok(amount)
    }

    /// Walk `who`'s unclaimed buckets. Returns the amount owed and the new
    /// cursor, or `None` if `who` has never held a lock.
    fn compute_claim(
        &self,
        escrow: &dyn VotingPower,
        who: &AccountId,
        supply_at: impl Fn(Timestamp) -> Option<Amount>,
    ) -> Result<Option<(Amount, Timestamp)>, FeeError> {
        let Some(first) = escrow.first_checkpoint(who) else {
            return Ok(None);
        };
        let limit = bucket_floor(self.last_token_time);
        let mut cursor = self
            .claim_cursors
            .get(who)
            .copied()
            .unwrap_or_else(|| bucket_ceil(first).max(self.start_time));
        let mut amount: Amount = 0;
        for _ in 0..self.settings.claim_bucket_limit {
            if cursor >= limit {
                break;
            }
            let Some(supply) = supply_at(cursor) else { break };
            let revenue = self.tokens_per_bucket.get(&cursor).copied().unwrap_or(0);
            if supply > 0 && revenue > 0 {
                let balance = escrow.power_of(who, cursor);
                let share = mul_div(balance, revenue, supply).ok_or(FeeError::ArithmeticOverflow)?;
                amount = amount.checked_add(share).ok_or(FeeError::ArithmeticOverflow)?;
            }
            cursor += WEEK;
        }
        Ok(Some((amount, cursor)))
    }

    /// Amount `who` could claim now without any checkpoint being written.
    /// Buckets without a recorded snapshot are priced from the escrow
    /// directly once they have started before `now`.
    pub fn claimable(&self, escrow: &dyn VotingPower, who: &AccountId, now: Timestamp) -> Amount {
        if self.status != DistributorStatus::Running {
            return 0;
        }
        let supply_at = |t: Timestamp| match self.supply.get(&t) {
            Some(s) => Some(*s),
            None if t < now => escrow.total_power_at(t).ok(),
            None => None,
        };
        match self.compute_claim(escrow, who, supply_at) {
            Ok(Some((amount, _))) => amount,
            _ => 0,
        }
    }

    // --- admin ---

    /// Sweep the revenue token and any intake input token to `recovery` and
    /// stop the distributor for good.
    pub fn kill(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &AccountId,
        recovery: &AccountId,
    ) -> Result<(), FeeError> {
        self.ensure_active()?;
        self.ownership.ensure_admin(caller)?;
        if recovery.is_zero() {
            return Err(FeeError::ZeroAddress);
        }
        let tokens = std::iter::once(self.token).chain(self.intake.input_token());
        for token in tokens {
            let balance = ledger.balance_of(token, &self.account);
            if balance > 0 {
                ledger.transfer(token, &self.account, recovery, balance)?;
                info!(%token, %recovery, balance, "balance swept");
            }
        }
        self.status = DistributorStatus::Killed;
        self.token_last_balance = 0;
        info!(%recovery, "distributor killed");
        Ok(())
    }

    /// Send the whole balance of a stray `token` to `to`. The revenue token
    /// and the intake input token are protected.
    pub fn recover_balance(
        &mut self,
        ledger: &mut dyn TokenLedger,
        caller: &AccountId,
        token: TokenId,
        to: &AccountId,
    ) -> Result<Amount, FeeError> {
        self.ensure_active()?;
        self.ownership.ensure_admin(caller)?;
        if token == self.token || self.intake.input_token() == Some(token) {
            return Err(FeeError::ProtectedToken);
        }
        if to.is_zero() {
            return Err(FeeError::ZeroAddress);
        }
        let balance = ledger.balance_of(token, &self.account);
        if balance > 0 {
            ledger.transfer(token, &self.account, to, balance)?;
        }
        info!(%token, %to, balance, "stray balance recovered");
        Ok(balance)
    }

    /// Flip whether non-admin callers may checkpoint revenue. Returns the
    /// new setting.
    pub fn toggle_public_checkpoint(&mut self, caller: &AccountId) -> Result<bool, FeeError> {
        self.ensure_active()?;
        self.ownership.ensure_admin(caller)?;
        self.settings.public_revenue_checkpoint = !self.settings.public_revenue_checkpoint;
        info!(enabled = self.settings.public_revenue_checkpoint, "public revenue checkpoint toggled");
        Ok(self.settings.public_revenue_checkpoint)
    }

    pub fn commit_transfer_ownership(&mut self, caller: &AccountId, new_admin: AccountId) -> Result<(), FeeError> {
        self.ensure_active()?;
        Ok(self.ownership.commit_transfer(caller, new_admin)?)
    }

    pub fn accept_transfer_ownership(&mut self, caller: &AccountId) -> Result<(), FeeError> {
        self.ensure_active()?;
        Ok(self.ownership.accept_transfer(caller)?)
    }

    fn ensure_active(&self) -> Result<(), FeeError> {
        if self.status == DistributorStatus::Killed {
            return Err(FeeError::Unavailable);
        }
        Ok(())
    }

    // --- reads ---

    pub fn status(&self) -> DistributorStatus {
        self.status
    }

    pub fn is_killed(&self) -> bool {
        self.status == DistributorStatus::Killed
    }

    pub fn start_time(&self) -> Timestamp {
        self.start_time
    }

    pub fn last_token_time(&self) -> Timestamp {
        self.last_token_time
    }

    pub fn token_last_balance(&self) -> Amount {
        self.token_last_balance
    }

    /// Revenue received but not yet assigned to any bucket due to rounding.
    pub fn dust(&self) -> Amount {
        self.dust
    }

    pub fn tokens_per_bucket(&self, bucket: Timestamp) -> Amount {
        self.tokens_per_bucket.get(&bucket_floor(bucket)).copied().unwrap_or(0)
    }

    /// Sum of revenue assigned to every bucket so far.
    pub fn total_distributed(&self) -> Amount {
        self.tokens_per_bucket.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    /// Total voting power snapshotted at the start of `bucket`.
    pub fn supply_at(&self, bucket: Timestamp) -> Option<Amount> {
        self.supply.get(&bucket_floor(bucket)).copied()
    }

    pub fn time_cursor(&self) -> Timestamp {
        self.time_cursor
    }

    pub fn claim_cursor(&self, who: &AccountId) -> Option<Timestamp> {
        self.claim_cursors.get(who).copied()
    }

    pub fn token(&self) -> TokenId {
        self.token
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn intake(&self) -> &RevenueIntake {
        &self.intake
    }

    pub fn settings(&self) -> &DistributorSettings {
        &self.settings
    }

    pub fn admin(&self) -> AccountId {
        self.ownership.admin()
    }

    pub fn future_admin(&self) -> Option<AccountId> {
        self.ownership.future_admin()
    }
}
