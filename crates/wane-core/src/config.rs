//! Runtime settings for the escrow, gauge controller and distributor.
//!
//! Provides [`WaneConfig`] with defaults equal to the protocol constants.
//! Settings can be built programmatically or loaded from a TOML/JSON file
//! layered with `WANE__<SECTION>__<KEY>` environment overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    MAX_CATCH_UP_BUCKETS, MAX_CLAIM_BATCH, MAX_CLAIM_BUCKETS, MAX_DISTRIBUTION_BUCKETS,
    TOKEN_CHECKPOINT_DEADLINE, VOTE_BUDGET_BPS, VOTE_COOLDOWN,
};
use crate::error::ConfigError;

const ENV_PREFIX: &str = "WANE";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(default)]
pub struct EscrowSettings {
    /// Buckets the global curve may be walked per call.
    pub catch_up_limit: u64,
}

impl Default for EscrowSettings {
    fn default() -> Self {
        Self { catch_up_limit: MAX_CATCH_UP_BUCKETS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(default)]
pub struct GaugeSettings {
    /// Voting budget per participant, in basis points.
    pub vote_budget_bps: u64,
    /// Minimum seconds between two votes on the same target.
    pub vote_cooldown_secs: u64,
}

impl Default for GaugeSettings {
    fn default() -> Self {
        Self { vote_budget_bps: VOTE_BUDGET_BPS, vote_cooldown_secs: VOTE_COOLDOWN }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode)]
#[serde(default)]
pub struct DistributorSettings {
    /// Buckets walked per revenue or supply checkpoint.
    pub catch_up_limit: u64,
    /// Buckets walked per claim.
    pub claim_bucket_limit: u64,
    /// Entries accepted by one `claim_many` call.
    pub claim_batch_limit: usize,
    /// Age of the last revenue checkpoint after which anyone may checkpoint.
    pub checkpoint_deadline_secs: u64,
    /// Whether non-admin callers may checkpoint revenue at all.
    pub public_revenue_checkpoint: bool,
}

impl Default for DistributorSettings {
    fn default() -> Self {
        Self {
            catch_up_limit: MAX_DISTRIBUTION_BUCKETS,
            claim_bucket_limit: MAX_CLAIM_BUCKETS,
            claim_batch_limit: MAX_CLAIM_BATCH,
            checkpoint_deadline_secs: TOKEN_CHECKPOINT_DEADLINE,
            public_revenue_checkpoint: false,
        }
    }
}

/// Top-level settings for a full deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaneConfig {
    pub escrow: EscrowSettings,
    pub gauge: GaugeSettings,
    pub distributor: DistributorSettings,
}

impl WaneConfig {
    /// Load from `path`, then apply `WANE__...` environment overrides.
    ///
    /// The file format is inferred from the extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .add_source(Self::environment())
            .build()
            .map_err(|e| ConfigError(e.to_string()))?;
        Self::finish(raw)
    }

    /// Defaults with only environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw = ::config::Config::builder()
            .add_source(Self::environment())
            .build()
            .map_err(|e| ConfigError(e.to_string()))?;
        Self::finish(raw)
    }

    /// Parse an in-memory TOML document.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let raw = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()
            .map_err(|e| ConfigError(e.to_string()))?;
        Self::finish(raw)
    }

    fn environment() -> ::config::Environment {
        ::config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator(ENV_SEPARATOR)
            .separator(ENV_SEPARATOR)
            .try_parsing(true)
    }

    fn finish(raw: ::config::Config) -> Result<Self, ConfigError> {
        let cfg: Self = raw.try_deserialize().map_err(|e| ConfigError(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings that would stall every bounded walk.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.escrow.catch_up_limit == 0 {
            return Err(ConfigError("escrow.catch_up_limit must be positive".into()));
        }
        if self.gauge.vote_budget_bps == 0 {
            return Err(ConfigError("gauge.vote_budget_bps must be positive".into()));
        }
        let d = &self.distributor;
        if d.catch_up_limit == 0 || d.claim_bucket_limit == 0 || d.claim_batch_limit == 0 {
            return Err(ConfigError("distributor limits must be positive".into()));
        }
        Ok(())
    }
}
