//! Per-user, per-direction running statistics and anomaly scoring.
//!
//! The numeric core of the monitor: an O(1) incremental mean per
//! (user, direction) pair, so scoring never re-reads the transaction
//! history.
//!
//! RULE: `score` must see the mean as it was BEFORE the transaction
//! being scored — an anomaly is relative to history, not including
//! itself. The consumer loop calls `score` first, `update` second.

use crate::{
    config::MonitorConfig,
    types::{Direction, Transaction, UserId},
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Running mean and sample count for one (user, direction) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectionStats {
    pub mean: Decimal,
    pub count: u64,
}

pub struct AccountStatistics {
    entries: HashMap<(UserId, Direction), DirectionStats>,
    credit_threshold: Decimal,
    debit_threshold: Decimal,
}

impl AccountStatistics {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            entries: HashMap::new(),
            credit_threshold: config.credit_anomaly_threshold,
            debit_threshold: config.debit_anomaly_threshold,
        }
    }

    /// Seed baselines from the historical transaction set.
    ///
    /// A user with no transactions of a given direction gets no entry:
    /// their first transaction of that kind has no baseline and is
    /// never flagged.
    pub fn seed(&mut self, history: &[Transaction]) {
        let mut sums: HashMap<(UserId, Direction), (Decimal, u64)> = HashMap::new();
        for txn in history {
            let slot = sums
                .entry((txn.user_id.clone(), txn.direction))
                .or_insert((Decimal::ZERO, 0));
            slot.0 += txn.amount;
            slot.1 += 1;
        }
        for ((user_id, direction), (sum, count)) in sums {
            self.entries.insert(
                (user_id, direction),
                DirectionStats {
                    mean: sum / Decimal::from(count),
                    count,
                },
            );
        }
    }

    /// Score a transaction against the pre-update mean.
    ///
    /// Returns the anomaly score (percentage deviation) when the
    /// fractional deviation strictly exceeds the direction's
    /// threshold; `None` when there is no baseline, the mean is zero,
    /// or the deviation is within tolerance.
    pub fn score(&self, txn: &Transaction) -> Option<Decimal> {
        let stats = self.entries.get(&(txn.user_id.clone(), txn.direction))?;
        if stats.mean == Decimal::ZERO {
            return None;
        }

        let percent_diff = (txn.amount - stats.mean).abs() / stats.mean;
        let threshold = match txn.direction {
            Direction::Credit => self.credit_threshold,
            Direction::Debit => self.debit_threshold,
        };

        if percent_diff > threshold {
            Some(percent_diff * Decimal::ONE_HUNDRED)
        } else {
            None
        }
    }

    /// Fold the transaction into the running mean:
    /// `new_mean = (old_mean * old_count + amount) / (old_count + 1)`.
    /// Called exactly once per processed transaction, after `score`.
    pub fn update(&mut self, txn: &Transaction) {
        let key = (txn.user_id.clone(), txn.direction);
        match self.entries.get_mut(&key) {
            Some(stats) => {
                let total = stats.mean * Decimal::from(stats.count) + txn.amount;
                stats.count += 1;
                stats.mean = total / Decimal::from(stats.count);
            }
            None => {
                self.entries.insert(
                    key,
                    DirectionStats {
                        mean: txn.amount,
                        count: 1,
                    },
                );
            }
        }
    }

    pub fn baseline(&self, user_id: &str, direction: Direction) -> Option<&DirectionStats> {
        self.entries.get(&(user_id.to_string(), direction))
    }

    pub fn tracked_pairs(&self) -> usize {
        self.entries.len()
    }
}
