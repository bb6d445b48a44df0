//! Monitoring configuration.
//!
//! Every detection threshold and timer cadence lives here. The engine
//! never hardcodes a window or cutoff — subsystems read this struct.

use crate::error::{MonitorError, MonitorResult};
use chrono::Duration as ChronoDuration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Two same-signature transactions closer together than this are
    /// duplicates. Also bounds the age of duplicate-cache entries.
    pub suppression_window_mins: i64,

    /// Fractional deviation from the running mean above which a credit
    /// is anomalous. Credits are naturally more variable than debits,
    /// so this threshold is wider.
    pub credit_anomaly_threshold: Decimal,

    /// Fractional deviation threshold for debits.
    pub debit_anomaly_threshold: Decimal,

    /// Cadence of the duplicate-cache expiry sweep.
    pub sweep_interval_secs: u64,

    /// Cadence of the balance scan. 5 s in the observed dev setup;
    /// production runs this daily. Purely a config change.
    pub recommendation_interval_secs: u64,

    /// Minimum gap between two recommendations to the same user.
    pub recommendation_cooldown_days: i64,

    /// Balances below this trigger a loan recommendation.
    pub low_balance_threshold: Decimal,

    /// Balances above this trigger an investment recommendation.
    pub high_balance_threshold: Decimal,

    /// How long the consumer waits on an empty queue before retrying.
    pub poll_backoff_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            suppression_window_mins: 5,
            credit_anomaly_threshold: Decimal::new(70, 2), // 0.70
            debit_anomaly_threshold: Decimal::new(10, 2),  // 0.10
            sweep_interval_secs: 300,
            recommendation_interval_secs: 5,
            recommendation_cooldown_days: 7,
            low_balance_threshold: Decimal::new(1_000, 0),
            high_balance_threshold: Decimal::new(1_500_000, 0),
            poll_backoff_secs: 5,
        }
    }
}

impl MonitorConfig {
    /// Load from a JSON file. Missing fields fall back to defaults.
    pub fn load(path: &str) -> MonitorResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MonitorError::Config(format!("Cannot read {path}: {e}")))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> MonitorResult<()> {
        if self.suppression_window_mins <= 0 {
            return Err(MonitorError::Config(
                "suppression_window_mins must be positive".into(),
            ));
        }
        if self.sweep_interval_secs == 0 || self.recommendation_interval_secs == 0 {
            return Err(MonitorError::Config(
                "timer intervals must be positive".into(),
            ));
        }
        if self.recommendation_cooldown_days <= 0 {
            return Err(MonitorError::Config(
                "recommendation_cooldown_days must be positive".into(),
            ));
        }
        if self.credit_anomaly_threshold < Decimal::ZERO
            || self.debit_anomaly_threshold < Decimal::ZERO
        {
            return Err(MonitorError::Config(
                "anomaly thresholds must be non-negative".into(),
            ));
        }
        if self.low_balance_threshold >= self.high_balance_threshold {
            return Err(MonitorError::Config(
                "low_balance_threshold must be below high_balance_threshold".into(),
            ));
        }
        Ok(())
    }

    pub fn suppression_window(&self) -> ChronoDuration {
        ChronoDuration::minutes(self.suppression_window_mins)
    }

    pub fn recommendation_cooldown(&self) -> ChronoDuration {
        ChronoDuration::days(self.recommendation_cooldown_days)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn recommendation_interval(&self) -> Duration {
        Duration::from_secs(self.recommendation_interval_secs)
    }

    pub fn poll_backoff(&self) -> Duration {
        Duration::from_secs(self.poll_backoff_secs)
    }
}
