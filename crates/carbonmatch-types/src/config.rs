//! Configuration for a CarbonMatch market.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Address, CarbonError, Result, constants};

/// How emissions reports affect credit balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionsPolicy {
    /// Reports are recorded and checked; balances are untouched.
    #[default]
    Advisory,
    /// Each report also retires up to the reported amount from the
    /// consumer's available credits.
    Retire,
}

/// Configuration of a single market instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// The sole root authority, fixed for the lifetime of the market.
    pub regulator: Address,
    /// Credits issued to every new consumer account.
    #[serde(default)]
    pub consumer_opening_credits: u64,
    /// Maximum number of open listings per seller account.
    #[serde(default = "default_max_open_listings")]
    pub max_open_listings_per_account: usize,
    /// Journal events retained before the oldest is evicted.
    #[serde(default = "default_journal_capacity")]
    pub journal_capacity: usize,
    #[serde(default)]
    pub emissions_policy: EmissionsPolicy,
    /// Bounded queue depth of the single-writer service.
    #[serde(default = "default_queue_depth")]
    pub service_queue_depth: usize,
}

fn default_max_open_listings() -> usize {
    constants::DEFAULT_MAX_OPEN_LISTINGS_PER_ACCOUNT
}

fn default_journal_capacity() -> usize {
    constants::DEFAULT_JOURNAL_CAPACITY
}

fn default_queue_depth() -> usize {
    constants::DEFAULT_SERVICE_QUEUE_DEPTH
}

impl MarketConfig {
    /// Config with defaults for everything except the regulator.
    #[must_use]
    pub fn new(regulator: Address) -> Self {
        Self {
            regulator,
            consumer_opening_credits: 0,
            max_open_listings_per_account: default_max_open_listings(),
            journal_capacity: default_journal_capacity(),
            emissions_policy: EmissionsPolicy::Advisory,
            service_queue_depth: default_queue_depth(),
        }
    }

    #[must_use]
    pub fn with_consumer_opening_credits(mut self, credits: u64) -> Self {
        self.consumer_opening_credits = credits;
        self
    }

    #[must_use]
    pub fn with_emissions_policy(mut self, policy: EmissionsPolicy) -> Self {
        self.emissions_policy = policy;
        self
    }

    #[must_use]
    pub fn with_journal_capacity(mut self, capacity: usize) -> Self {
        self.journal_capacity = capacity;
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| CarbonError::Configuration(format!("invalid config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Reject configurations the market cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.regulator.is_zero() {
            return Err(CarbonError::Configuration(
                "regulator must not be the zero address".into(),
            ));
        }
        if self.max_open_listings_per_account == 0 {
            return Err(CarbonError::Configuration(
                "max_open_listings_per_account must be > 0".into(),
            ));
        }
        if self.journal_capacity == 0 {
            return Err(CarbonError::Configuration(
                "journal_capacity must be > 0".into(),
            ));
        }
        if self.service_queue_depth == 0 {
            return Err(CarbonError::Configuration(
                "service_queue_depth must be > 0".into(),
            ));
        }
        Ok(())
    }
}
