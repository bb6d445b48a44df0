//! The transaction write path: persist first, monitor second.
//!
//! RULE: A transaction reaches the ingest queue only after its row is
//! durable. The monitor never sees a transaction the database could
//! still lose.

use crate::{
    error::{MonitorError, MonitorResult},
    queue::IngestProducer,
    store::TxnStore,
    types::{Direction, Transaction},
};
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

pub struct TransactionWriter {
    store: TxnStore,
    producer: IngestProducer,
}

impl TransactionWriter {
    pub fn new(store: TxnStore, producer: IngestProducer) -> Self {
        Self { store, producer }
    }

    /// Persist a new transaction, then hand it to the monitor.
    pub fn record(
        &self,
        user_id: &str,
        amount: Decimal,
        direction: Direction,
        narration: &str,
    ) -> MonitorResult<Transaction> {
        if amount < Decimal::ZERO {
            return Err(MonitorError::InvalidTransaction(format!(
                "negative amount {amount} for user {user_id}"
            )));
        }
        let txn = Transaction {
            txn_id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            amount,
            direction,
            narration: narration.to_string(),
            timestamp: Utc::now(),
        };
        self.store.insert_transaction(&txn)?;
        self.producer.enqueue(txn.clone())?;
        log::debug!("recorded {} {} of {} for {}", txn.txn_id, direction, amount, user_id);
        Ok(txn)
    }

    /// Bulk-load historical transactions without waking the monitor.
    /// The ingest gate goes down for the duration of the load and
    /// comes back up even when an insert fails.
    pub fn bulk_seed(&self, history: &[Transaction]) -> MonitorResult<()> {
        self.producer.set_enabled(false);
        let result = self.insert_all(history);
        self.producer.set_enabled(true);
        if result.is_ok() {
            log::info!("bulk seed inserted {} transactions", history.len());
        }
        result
    }

    fn insert_all(&self, history: &[Transaction]) -> MonitorResult<()> {
        for txn in history {
            self.store.insert_transaction(txn)?;
        }
        Ok(())
    }

    pub fn store(&self) -> &TxnStore {
        &self.store
    }
}
