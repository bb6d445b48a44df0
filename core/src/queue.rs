//! The ingest queue — ordered hand-off from the persistence-write
//! path to the monitor.
//!
//! RULE: The producer never blocks. The consumer is the only place
//! that waits, and only with a bounded timeout so shutdown stays
//! prompt.
//!
//! The enable gate exists for bulk seeding: historical loads write
//! rows directly and must not re-trigger monitoring, so `enqueue`
//! becomes a no-op while the gate is down.

use crate::{
    error::{MonitorError, MonitorResult},
    types::Transaction,
};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

/// Create a connected producer/consumer pair with the gate enabled.
pub fn ingest_queue() -> (IngestProducer, IngestConsumer) {
    let (tx, rx) = unbounded();
    let enabled = Arc::new(AtomicBool::new(true));
    (
        IngestProducer { tx, enabled },
        IngestConsumer { rx },
    )
}

/// Write half, held by the persistence-write path.
#[derive(Clone)]
pub struct IngestProducer {
    tx: Sender<Transaction>,
    enabled: Arc<AtomicBool>,
}

impl IngestProducer {
    /// Append to the tail. A no-op while the gate is disabled.
    /// Once accepted, a transaction is never dropped.
    pub fn enqueue(&self, txn: Transaction) -> MonitorResult<()> {
        if !self.is_enabled() {
            log::debug!("ingest gate disabled, dropping enqueue of {}", txn.txn_id);
            return Ok(());
        }
        self.tx.send(txn).map_err(|_| MonitorError::QueueClosed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

/// Read half, owned by the monitor's consumer loop.
pub struct IngestConsumer {
    rx: Receiver<Transaction>,
}

impl IngestConsumer {
    /// Pop from the head in FIFO order, waiting at most `timeout`.
    /// `Ok(None)` means the queue stayed empty for the full wait.
    pub fn recv_timeout(&self, timeout: Duration) -> MonitorResult<Option<Transaction>> {
        match self.rx.recv_timeout(timeout) {
            Ok(txn) => Ok(Some(txn)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(MonitorError::QueueClosed),
        }
    }

    /// Non-blocking pop, used by tests to drain deterministically.
    pub fn try_recv(&self) -> Option<Transaction> {
        self.rx.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
