//! End-to-end scenarios across escrow, gauge controller and distributor.
//!
//! Each test builds a fresh [`Deployment`] on one in-memory ledger and
//! drives it with an explicit clock.

use wane_core::config::WaneConfig;
use wane_core::constants::{DAY, MAX_LOCK_DURATION, POWER_SCALE, WEEK, WEIGHT_PRECISION, YEAR};
use wane_core::error::{FeeError, GaugeError, LedgerError};
use wane_core::ledger::TokenLedger;
use wane_core::persist::{load_snapshot, save_snapshot};
use wane_core::traits::VotingPower;
use wane_core::types::{Amount, CatchUp, bucket_floor};
use wane_escrow::VotingEscrow;
use wane_fees::FeeDistributor;
use wane_gauge::{FlatEmission, GaugeController, target_emissions};
use wane_tests::helpers::*;

// --- decay ledger ---

#[test]
fn max_duration_lock_decays_linearly_and_unlocks() {
    init_tracing();
    // Start so that `t0 + MAX_LOCK_DURATION` sits on a bucket boundary.
    let t0 = WEEK - MAX_LOCK_DURATION % WEEK;
    let end = t0 + MAX_LOCK_DURATION;
    assert_eq!(bucket_floor(end), end);

    let mut d = Deployment::with_defaults(0);
    let alice = acct("alice");
    d.lock(&alice, 100, end, t0).unwrap();

    assert_eq!(d.escrow.voting_balance(&alice, t0), 100);
    assert_eq!(d.escrow.voting_balance(&alice, t0 + MAX_LOCK_DURATION / 2), 50);
    assert_eq!(d.escrow.voting_balance(&alice, end), 0);

    assert_eq!(d.escrow.withdraw(&mut d.ledger, &alice, end - 1), Err(LedgerError::LockNotExpired));
    assert_eq!(d.escrow.withdraw(&mut d.ledger, &alice, end), Ok(100));
    assert!(d.escrow.locked(&alice).is_empty());
    assert_eq!(d.ledger.balance_of(STAKE, &alice), 100);
    assert_eq!(d.escrow.total_locked(), 0);
    assert_eq!(d.escrow.total_power_at(end).unwrap(), 0);
}

#[test]
fn longer_lock_keeps_power_after_shorter_expires() {
    let mut d = Deployment::with_defaults(0);
    let (short, long) = (acct("short"), acct("long"));
    d.lock(&short, 100, YEAR, 0).unwrap();
    d.lock(&long, 100, 2 * YEAR, 0).unwrap();

    // Unlock times are floored to the bucket grid.
    let one_year = d.escrow.lock_end(&short);
    assert_eq!(d.escrow.lock_end(&long), 2 * one_year);

    let short_start = d.escrow.power_of(&short, 0);
    assert_eq!(d.escrow.power_of(&long, 0), 2 * short_start);
    assert_eq!(d.escrow.power_of(&short, one_year), 0);
    assert_eq!(d.escrow.power_of(&long, one_year), short_start);
    assert_eq!(d.escrow.total_power_at(one_year).unwrap(), short_start);
}

#[test]
fn supply_tracks_participants_through_lifecycle() {
    let mut d = Deployment::with_defaults(0);
    let users: Vec<_> = (0..5).map(|i| acct(&format!("u{i}"))).collect();
    for (i, u) in users.iter().enumerate() {
        d.lock(u, 1_000 * (i as Amount + 1), (10 + 5 * i as u64) * WEEK, i as u64 * DAY).unwrap();
    }
    d.ledger.mint(STAKE, &users[0], 500).unwrap();
    d.ledger.approve(STAKE, &users[0], &escrow_account(), 500).unwrap();
    d.escrow.increase_amount(&mut d.ledger, &users[0], 500, 2 * WEEK).unwrap();
    d.escrow.increase_unlock_time(&users[1], 40 * WEEK, 3 * WEEK).unwrap();
    d.escrow.force_expire(&mut d.ledger, &admin(), &users[2], 4 * WEEK).unwrap();

    for week in [4, 9, 12, 17, 30, 45] {
        let t = week * WEEK;
        assert_eq!(d.escrow.checkpoint(t), Ok(CatchUp::Complete));
        let sum: Amount = users.iter().map(|u| d.escrow.power_of(u, t)).sum();
        assert_eq!(d.escrow.total_power_at(t).unwrap(), sum, "week {week}");
    }
}

#[test]
fn idle_escrow_needs_incremental_checkpoints() {
    let mut d = Deployment::with_defaults(0);
    let alice = acct("alice");
    d.lock(&alice, 10, 200 * WEEK, 0).unwrap();

    let far = 300 * WEEK;
    // Reads stop replaying once the curve has decayed to zero.
    assert_eq!(d.escrow.total_power_at(far), Ok(0));
    d.ledger.mint(STAKE, &acct("bob"), 10).unwrap();
    d.ledger.approve(STAKE, &acct("bob"), &escrow_account(), 10).unwrap();
    assert!(matches!(
        d.escrow.create_lock(&mut d.ledger, &acct("bob"), 10, far + WEEK, far),
        Err(LedgerError::CatchUpRequired { .. })
    ));

    assert_eq!(d.escrow.checkpoint(far), Ok(CatchUp::Partial { reached: 255 * WEEK }));
    assert_eq!(d.escrow.checkpoint(far), Ok(CatchUp::Complete));
    assert_eq!(d.escrow.total_power_at(far), Ok(0));
    d.escrow.create_lock(&mut d.ledger, &acct("bob"), 10, far + WEEK, far).unwrap();
}

// --- gauge weights ---

#[test]
fn revote_is_not_retroactive() {
    init_tracing();
    let mut d = Deployment::with_defaults(0);
    let (a, b) = (acct("gauge-a"), acct("gauge-b"));
    d.gauges("liquidity", &[a, b], 0).unwrap();
    let alice = acct("alice");
    d.lock(&alice, 1_000, 100 * WEEK, 0).unwrap();

    d.vote(&alice, &a, 10_000, DAY).unwrap();
    assert_eq!(d.gauge.relative_weight(&a, DAY), Ok(0));
    assert_eq!(d.gauge.relative_weight(&a, WEEK), Ok(WEIGHT_PRECISION));

    let t = 3 * WEEK + 2 * DAY;
    d.vote(&alice, &a, 5_000, t).unwrap();
    d.vote(&alice, &b, 5_000, t).unwrap();

    assert_eq!(d.gauge.relative_weight(&a, t), Ok(WEIGHT_PRECISION));
    assert_eq!(d.gauge.relative_weight(&a, 3 * WEEK), Ok(WEIGHT_PRECISION));
    assert_eq!(d.gauge.relative_weight(&a, 4 * WEEK), Ok(WEIGHT_PRECISION / 2));
    assert_eq!(d.gauge.relative_weight(&b, 4 * WEEK), Ok(WEIGHT_PRECISION / 2));
    assert_eq!(d.gauge.power_used(&alice), 10_000);
}

#[test]
fn vote_errors_are_distinguishable() {
    let mut d = Deployment::with_defaults(0);
    let a = acct("gauge-a");
    d.gauges("liquidity", &[a], 0).unwrap();
    let (alice, nobody) = (acct("alice"), acct("nobody"));
    d.lock(&alice, 1_000, 100 * WEEK, 0).unwrap();

    assert_eq!(d.vote(&alice, &acct("ghost"), 1, 0), Err(GaugeError::TargetNotFound));
    assert_eq!(d.vote(&nobody, &a, 1, 0), Err(GaugeError::NoVotingPower));
    d.vote(&alice, &a, 10_000, 0).unwrap();
    assert!(matches!(d.vote(&alice, &a, 5_000, DAY), Err(GaugeError::VoteCooldown { .. })));
}

#[test]
fn expiring_lock_stops_gauge_weight() {
    let mut d = Deployment::with_defaults(0);
    let a = acct("gauge-a");
    d.gauges("liquidity", &[a], 0).unwrap();
    let alice = acct("alice");
    d.lock(&alice, 1_000, 6 * WEEK, 0).unwrap();
    d.vote(&alice, &a, 10_000, 0).unwrap();

    assert_eq!(d.gauge.target_weight(&a, WEEK), Ok(1_000 * 5 * WEEK as Amount));
    assert_eq!(d.gauge.target_weight(&a, 6 * WEEK), Ok(0));
    d.gauge.checkpoint_target(&a, 8 * WEEK).unwrap();
    assert_eq!(d.gauge.checkpoint_total(8 * WEEK), Ok(0));
    assert_eq!(d.gauge.relative_weight(&a, 7 * WEEK), Ok(0));
    assert_eq!(d.vote(&alice, &a, 10_000, 8 * WEEK), Err(GaugeError::LockExpiresTooSoon));
}

#[test]
fn emissions_follow_votes() {
    let mut d = Deployment::with_defaults(0);
    let (a, b) = (acct("gauge-a"), acct("gauge-b"));
    d.gauges("liquidity", &[a, b], 0).unwrap();
    let (alice, bob) = (acct("alice"), acct("bob"));
    d.lock(&alice, 1_000, 100 * WEEK, 0).unwrap();
    d.lock(&bob, 3_000, 100 * WEEK, 0).unwrap();
    d.vote(&alice, &a, 10_000, 0).unwrap();
    d.vote(&bob, &b, 10_000, 0).unwrap();

    let flat = FlatEmission { rate: 4, start: 0 };
    let a_share = target_emissions(&d.gauge, &flat, &a, WEEK, 3 * WEEK).unwrap();
    let b_share = target_emissions(&d.gauge, &flat, &b, WEEK, 3 * WEEK).unwrap();
    assert_eq!(a_share, 2 * WEEK as Amount);
    assert_eq!(b_share, 6 * WEEK as Amount);
}

#[test]
fn admin_weights_are_in_power_units() {
    let mut d = Deployment::with_defaults(0);
    let cat = d.gauge.add_category(&admin(), "treasury", 1, 0).unwrap();
    let fixed = acct("fixed");
    d.gauge.add_target(&admin(), fixed, cat, 100, 0).unwrap();
    let voted = acct("voted");
    d.gauge.add_target(&admin(), voted, cat, 0, 0).unwrap();

    // A full vote carries `slope * (end - next)` from the next bucket.
    let alice = acct("alice");
    d.lock(&alice, 100, 100 * WEEK, 0).unwrap();
    d.vote(&alice, &voted, 10_000, 0).unwrap();
    assert_eq!(d.gauge.target_weight(&fixed, WEEK), Ok(100 * POWER_SCALE));
    assert_eq!(d.gauge.target_weight(&voted, WEEK), Ok(100 * 99 * WEEK as Amount));
}

// --- fee distribution ---

#[test]
fn revenue_over_two_buckets_is_split_and_claimed() {
    init_tracing();
    let mut d = Deployment::with_defaults(0);
    let alice = acct("alice");
    d.lock(&alice, 100, 100 * WEEK, 0).unwrap();

    assert_eq!(d.pay_revenue(700, 2 * WEEK), Ok(700));
    assert_eq!(d.checkpoint_revenue(2 * WEEK), Ok(700));
    assert_eq!(d.fees.tokens_per_bucket(0), 350);
    assert_eq!(d.fees.tokens_per_bucket(WEEK), 350);

    assert_eq!(d.claim(&alice, 2 * WEEK), Ok(700));
    assert_eq!(d.revenue_balance(&alice), 700);
    assert_eq!(d.revenue_balance(&distributor_account()), 0);
}

#[test]
fn claims_are_proportional_per_bucket() {
    let mut d = Deployment::with_defaults(0);
    let (alice, bob) = (acct("alice"), acct("bob"));
    d.lock(&alice, 100, 100 * WEEK, 0).unwrap();
    // Bob only appears in the second bucket, with the same power as Alice
    // has at that bucket's start.
    d.lock(&bob, 100, 100 * WEEK, WEEK).unwrap();

    d.pay_revenue(700, 2 * WEEK).unwrap();
    d.checkpoint_revenue(2 * WEEK).unwrap();

    let alice_paid = d.claim(&alice, 2 * WEEK).unwrap();
    let bob_paid = d.claim(&bob, 2 * WEEK).unwrap();
    assert_eq!(alice_paid, 350 + 175);
    assert_eq!(bob_paid, 175);
}

#[test]
fn revenue_accumulates_across_many_weeks() {
    let mut d = Deployment::with_defaults(0);
    let holders: Vec<_> = (0..4).map(|i| acct(&format!("h{i}"))).collect();
    for h in &holders {
        d.lock(h, 250, 150 * WEEK, 0).unwrap();
    }
    let mut paid_in: Amount = 0;
    for week in 1..=30u64 {
        d.pay_revenue(1_000 + week as Amount, week * WEEK).unwrap();
        paid_in += 1_000 + week as Amount;
        d.checkpoint_revenue(week * WEEK).unwrap();
        d.fees.checkpoint_voting_power(&mut d.escrow, week * WEEK).unwrap();
    }
    let mut paid_out: Amount = 0;
    for h in &holders {
        paid_out += d.claim(h, 30 * WEEK).unwrap();
    }
    let undistributed = d.fees.tokens_per_bucket(30 * WEEK) + d.fees.dust();
    assert!(paid_out <= paid_in - undistributed);
    // Four equal holders: at most one unit of rounding per holder per bucket.
    assert!(paid_in - undistributed - paid_out <= 4 * 30);
}

#[test]
fn killed_distributor_rejects_everything() {
    let mut d = Deployment::with_defaults(0);
    let alice = acct("alice");
    d.lock(&alice, 100, 100 * WEEK, 0).unwrap();
    d.pay_revenue(500, WEEK).unwrap();
    let safe = acct("safe");
    d.fees.kill(&mut d.ledger, &admin(), &safe).unwrap();
    assert_eq!(d.revenue_balance(&safe), 500);
    assert_eq!(d.claim(&alice, 2 * WEEK), Err(FeeError::Unavailable));
    assert_eq!(d.pay_revenue(1, 2 * WEEK), Err(FeeError::Unavailable));
    assert_eq!(d.checkpoint_revenue(2 * WEEK), Err(FeeError::Unavailable));
}

// --- persistence and configuration ---

#[test]
fn snapshots_restore_identical_state() {
    let mut d = Deployment::with_defaults(0);
    let a = acct("gauge-a");
    d.gauges("liquidity", &[a], 0).unwrap();
    let alice = acct("alice");
    d.lock(&alice, 1_000, 80 * WEEK, 0).unwrap();
    d.vote(&alice, &a, 7_500, 0).unwrap();
    d.pay_revenue(900, 3 * WEEK).unwrap();
    d.checkpoint_revenue(3 * WEEK).unwrap();

    let dir = tempfile::tempdir().unwrap();
    save_snapshot(&dir.path().join("escrow.bin"), &d.escrow).unwrap();
    save_snapshot(&dir.path().join("gauge.bin"), &d.gauge).unwrap();
    save_snapshot(&dir.path().join("fees.bin"), &d.fees).unwrap();

    let escrow: VotingEscrow = load_snapshot(&dir.path().join("escrow.bin")).unwrap();
    let gauge: GaugeController = load_snapshot(&dir.path().join("gauge.bin")).unwrap();
    let fees: FeeDistributor = load_snapshot(&dir.path().join("fees.bin")).unwrap();

    assert_eq!(escrow, d.escrow);
    assert_eq!(gauge, d.gauge);
    assert_eq!(fees, d.fees);
    assert_eq!(escrow.power_of(&alice, 10 * WEEK), d.escrow.power_of(&alice, 10 * WEEK));
    assert_eq!(gauge.relative_weight(&a, 2 * WEEK), d.gauge.relative_weight(&a, 2 * WEEK));
    assert_eq!(fees.claimable(&escrow, &alice, 3 * WEEK), d.fees.claimable(&d.escrow, &alice, 3 * WEEK));
    assert_eq!(escrow.user_slope(&alice), 1_000);
}

#[test]
fn configured_limits_apply() {
    let config = WaneConfig::from_toml_str(
        "[gauge]\nvote_cooldown_secs = 0\n\n[distributor]\nclaim_bucket_limit = 1\n",
    )
    .unwrap();
    let mut d = Deployment::new(&config, 0);
    let a = acct("gauge-a");
    d.gauges("liquidity", &[a], 0).unwrap();
    let alice = acct("alice");
    d.lock(&alice, 100, 50 * WEEK, 0).unwrap();

    d.vote(&alice, &a, 10_000, 0).unwrap();
    d.vote(&alice, &a, 2_000, 1).unwrap();
    assert_eq!(d.gauge.power_used(&alice), 2_000);

    d.pay_revenue(700, 2 * WEEK).unwrap();
    d.checkpoint_revenue(2 * WEEK).unwrap();
    assert_eq!(d.claim(&alice, 2 * WEEK), Ok(350));
    assert_eq!(d.claim(&alice, 2 * WEEK), Ok(350));
}
