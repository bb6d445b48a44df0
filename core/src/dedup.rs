//! Duplicate-transaction suppression cache.
//!
//! Keyed by the (user, direction, amount) signature, valued by the
//! most recent timestamp seen for that signature. The consumer loop
//! and the sweep timer touch this cache concurrently, so it is the
//! one structure in the engine backed by a concurrent map: individual
//! key operations are serialized per shard, and a sweep never blocks
//! the whole cache.
//!
//! The window slides: every match overwrites the stored timestamp,
//! duplicate or not, so the next check is measured against the most
//! recent sighting.

use crate::{
    config::MonitorConfig,
    types::{Direction, Transaction, UserId},
};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;

/// The composite signature that identifies "the same" transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TxnSignature {
    user_id: UserId,
    direction: Direction,
    amount: Decimal,
}

impl TxnSignature {
    fn of(txn: &Transaction) -> Self {
        Self {
            user_id: txn.user_id.clone(),
            direction: txn.direction,
            amount: txn.amount,
        }
    }
}

pub struct DuplicateSuppressionCache {
    cache: DashMap<TxnSignature, DateTime<Utc>>,
    window: Duration,
}

impl DuplicateSuppressionCache {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            cache: DashMap::new(),
            window: config.suppression_window(),
        }
    }

    /// Returns true when a same-signature transaction was seen
    /// strictly less than one window ago. Always records the new
    /// timestamp; inserts when the signature is unseen.
    pub fn check_and_record(&self, txn: &Transaction) -> bool {
        match self.cache.entry(TxnSignature::of(txn)) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let previous = *entry.get();
                let is_duplicate = txn.timestamp.signed_duration_since(previous) < self.window;
                entry.insert(txn.timestamp);
                is_duplicate
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(txn.timestamp);
                false
            }
        }
    }

    /// Remove every entry older than the suppression window relative
    /// to `now`. Runs on the sweep timer thread; entries updated
    /// mid-sweep may survive one extra cycle, which is acceptable.
    pub fn sweep(&self, now: DateTime<Utc>) {
        let before = self.cache.len();
        self.cache
            .retain(|_, seen_at| now.signed_duration_since(*seen_at) <= self.window);
        let removed = before.saturating_sub(self.cache.len());
        if removed > 0 {
            log::debug!("duplicate cache sweep removed {removed} expired entries");
        }
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
