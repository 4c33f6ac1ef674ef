//! Shared deployment harness for scenario and adversarial tests.

use wane_core::config::WaneConfig;
use wane_core::error::{FeeError, GaugeError, LedgerError};
use wane_core::ledger::{MemoryLedger, TokenLedger};
use wane_core::types::{AccountId, Amount, CategoryId, Timestamp, TokenId};
use wane_escrow::VotingEscrow;
use wane_fees::{FeeDistributor, RevenueIntake};
use wane_gauge::GaugeController;

pub const STAKE: TokenId = TokenId(1);
pub const REVENUE: TokenId = TokenId(2);

/// Deterministic account from a label.
pub fn acct(label: &str) -> AccountId {
    AccountId::derive(label)
}

pub fn admin() -> AccountId {
    acct("admin")
}

pub fn escrow_account() -> AccountId {
    acct("escrow")
}

pub fn distributor_account() -> AccountId {
    acct("distributor")
}

/// Install a test-writer subscriber once. Honours `RUST_LOG`, defaults to
/// `warn`.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// One escrow, one gauge controller and one direct-intake distributor
/// sharing a ledger, all created at the same instant.
pub struct Deployment {
    pub ledger: MemoryLedger,
    pub escrow: VotingEscrow,
    pub gauge: GaugeController,
    pub fees: FeeDistributor,
}

impl Deployment {
    pub fn new(config: &WaneConfig, now: Timestamp) -> Self {
        let escrow = VotingEscrow::new(admin(), STAKE, escrow_account(), config.escrow.clone(), now)
            .expect("escrow");
        let gauge = GaugeController::new(admin(), config.gauge.clone(), now).expect("gauge");
        let fees = FeeDistributor::new(
            admin(),
            REVENUE,
            distributor_account(),
            RevenueIntake::Direct,
            config.distributor.clone(),
            now,
        )
        .expect("distributor");
        Self { ledger: MemoryLedger::new(), escrow, gauge, fees }
    }

    pub fn with_defaults(now: Timestamp) -> Self {
        Self::new(&WaneConfig::default(), now)
    }

    /// Mint `amount` of stake to `who` and lock it until `unlock_time`.
    pub fn lock(
        &mut self,
        who: &AccountId,
        amount: Amount,
        unlock_time: Timestamp,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.ledger.mint(STAKE, who, amount)?;
        self.ledger.approve(STAKE, who, &escrow_account(), amount)?;
        self.escrow.create_lock(&mut self.ledger, who, amount, unlock_time, now)
    }

    /// Register a category with the given targets, all with zero admin
    /// weight.
    pub fn gauges(&mut self, category: &str, targets: &[AccountId], now: Timestamp) -> Result<CategoryId, GaugeError> {
        let id = self.gauge.add_category(&admin(), category, 1, now)?;
        for t in targets {
            self.gauge.add_target(&admin(), *t, id, 0, now)?;
        }
        Ok(id)
    }

    pub fn vote(&mut self, who: &AccountId, target: &AccountId, power_bps: u64, now: Timestamp) -> Result<(), GaugeError> {
        self.gauge.vote(&self.escrow, who, target, power_bps, now)
    }

    /// Pay `amount` of revenue into the distributor through `deposit_from`.
    pub fn pay_revenue(&mut self, amount: Amount, now: Timestamp) -> Result<Amount, FeeError> {
        let payer = acct("fee-source");
        self.ledger.mint(REVENUE, &payer, amount)?;
        self.ledger.approve(REVENUE, &payer, &distributor_account(), amount)?;
        self.fees.deposit_from(&mut self.ledger, &payer, now)
    }

    pub fn checkpoint_revenue(&mut self, now: Timestamp) -> Result<Amount, FeeError> {
        self.fees.checkpoint_revenue(&self.ledger, &admin(), now)
    }

    pub fn claim(&mut self, who: &AccountId, now: Timestamp) -> Result<Amount, FeeError> {
        self.fees.claim(&mut self.ledger, &mut self.escrow, who, None, now)
    }

    pub fn revenue_balance(&self, who: &AccountId) -> Amount {
        self.ledger.balance_of(REVENUE, who)
    }
}
