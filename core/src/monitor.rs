//! The transaction monitor — detection pipeline and worker threads.
//!
//! RULE: Per-transaction processing is strictly ordered:
//! score against the pre-update mean, then the duplicate check, then
//! the statistics update, then the balance update. Reordering changes
//! what counts as an anomaly.
//!
//! Sink failures are best-effort: a failed dispatch is logged and the
//! pipeline moves on. Hydration failures are fatal: a monitor that
//! cannot load its baselines must not score live traffic.

use crate::{
    alert::{AlertEvent, NotificationSink},
    balance::{BalanceTracker, BalanceView},
    config::MonitorConfig,
    dedup::DuplicateSuppressionCache,
    error::{MonitorError, MonitorResult},
    queue::IngestConsumer,
    recommend::RecommendationScheduler,
    stats::AccountStatistics,
    store::TxnStore,
    types::Transaction,
};
use chrono::Utc;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Lifecycle of the monitor. Transitions only move forward:
/// Uninitialized → Hydrating → Running → Stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Uninitialized,
    Hydrating,
    Running,
    Stopped,
}

pub struct TransactionMonitor {
    stats: AccountStatistics,
    dedup: Arc<DuplicateSuppressionCache>,
    balances: BalanceTracker,
    sink: Arc<dyn NotificationSink>,
    state: MonitorState,
}

impl TransactionMonitor {
    pub fn new(config: &MonitorConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            stats: AccountStatistics::new(config),
            dedup: Arc::new(DuplicateSuppressionCache::new(config)),
            balances: BalanceTracker::new(),
            sink,
            state: MonitorState::Uninitialized,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Load baselines and balances from the full stored history.
    /// Exactly one hydration per monitor; a failure leaves the
    /// monitor stopped.
    pub fn hydrate(&mut self, store: &TxnStore) -> MonitorResult<()> {
        if self.state != MonitorState::Uninitialized {
            return Err(MonitorError::Hydration(format!(
                "hydrate called in state {:?}",
                self.state
            )));
        }
        self.state = MonitorState::Hydrating;

        let history = match store.all_transactions() {
            Ok(history) => history,
            Err(err) => {
                self.state = MonitorState::Stopped;
                return Err(MonitorError::Hydration(err.to_string()));
            }
        };

        self.stats.seed(&history);
        self.balances.seed(&history);
        self.state = MonitorState::Running;
        log::info!(
            "monitor hydrated: {} transactions, {} (user, direction) baselines",
            history.len(),
            self.stats.tracked_pairs()
        );
        Ok(())
    }

    /// Run one transaction through the pipeline. No-op with a warning
    /// unless the monitor is running.
    pub fn process(&mut self, txn: &Transaction) {
        if self.state != MonitorState::Running {
            log::warn!(
                "dropping transaction {}: monitor is {:?}",
                txn.txn_id,
                self.state
            );
            return;
        }

        if let Some(anomaly_score) = self.stats.score(txn) {
            log::warn!(
                "anomalous {} of {} for user {} (score {})",
                txn.direction,
                txn.amount,
                txn.user_id,
                anomaly_score.round_dp(2)
            );
            self.emit(AlertEvent::ThresholdExceeded {
                user_id: txn.user_id.clone(),
                direction: txn.direction,
                amount: txn.amount,
                anomaly_score,
            });
        }

        if self.dedup.check_and_record(txn) {
            log::warn!(
                "possible duplicate {} of {} for user {}",
                txn.direction,
                txn.amount,
                txn.user_id
            );
            self.emit(AlertEvent::DuplicateTransaction {
                user_id: txn.user_id.clone(),
                direction: txn.direction,
                amount: txn.amount,
            });
        }

        self.stats.update(txn);
        self.balances.apply(txn);
    }

    fn emit(&self, event: AlertEvent) {
        if let Err(err) = self.sink.dispatch(&event) {
            log::warn!("alert dispatch failed for {}: {err}", event.user_id());
        }
    }

    pub fn statistics(&self) -> &AccountStatistics {
        &self.stats
    }

    pub fn balance_view(&self) -> BalanceView {
        self.balances.view()
    }

    pub fn dedup_cache(&self) -> Arc<DuplicateSuppressionCache> {
        Arc::clone(&self.dedup)
    }

    pub fn sink_handle(&self) -> Arc<dyn NotificationSink> {
        Arc::clone(&self.sink)
    }

    pub fn stop(&mut self) {
        self.state = MonitorState::Stopped;
    }
}

/// Running worker threads plus the shutdown signal that stops them.
///
/// Dropping the handle stops the monitor: the shutdown sender is
/// dropped, every worker sees the disconnect within one poll
/// interval, and the threads are joined.
pub struct MonitorHandle {
    shutdown_tx: Option<Sender<()>>,
    threads: Vec<JoinHandle<()>>,
}

impl MonitorHandle {
    pub fn stop(&mut self) {
        self.shutdown_tx.take();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                log::error!("monitor worker thread panicked");
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Start the three workers: the consumer loop, the duplicate-cache
/// sweep timer, and the recommendation scheduler. The monitor must
/// already be hydrated; it moves into the consumer thread.
pub fn spawn(
    mut monitor: TransactionMonitor,
    consumer: IngestConsumer,
    config: &MonitorConfig,
) -> MonitorHandle {
    let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

    let dedup = monitor.dedup_cache();
    let sink = monitor.sink_handle();
    let mut scheduler = RecommendationScheduler::new(monitor.balance_view(), config);

    let poll_backoff = config.poll_backoff();
    let sweep_interval = config.sweep_interval();
    let recommendation_interval = config.recommendation_interval();

    let consumer_shutdown = shutdown_rx.clone();
    let consumer_thread = thread::spawn(move || {
        loop {
            if shutdown_requested(&consumer_shutdown) {
                break;
            }
            match consumer.recv_timeout(poll_backoff) {
                Ok(Some(txn)) => monitor.process(&txn),
                Ok(None) => {}
                Err(_) => {
                    log::info!("ingest queue closed, consumer loop exiting");
                    break;
                }
            }
        }
        monitor.stop();
    });

    // Both timers fire once at startup, then every interval.
    let sweep_shutdown = shutdown_rx.clone();
    let sweep_thread = thread::spawn(move || loop {
        dedup.sweep(Utc::now());
        match sweep_shutdown.recv_timeout(sweep_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }
    });

    let recommend_thread = thread::spawn(move || loop {
        for event in scheduler.scan(Utc::now()) {
            if let Err(err) = sink.dispatch(&event) {
                log::warn!("recommendation dispatch failed for {}: {err}", event.user_id());
            }
        }
        match shutdown_rx.recv_timeout(recommendation_interval) {
            Err(RecvTimeoutError::Timeout) => {}
            _ => break,
        }
    });

    MonitorHandle {
        shutdown_tx: Some(shutdown_tx),
        threads: vec![consumer_thread, sweep_thread, recommend_thread],
    }
}

fn shutdown_requested(rx: &Receiver<()>) -> bool {
    !matches!(rx.try_recv(), Err(TryRecvError::Empty))
}
