//! finwatch-core — the transaction monitoring engine.
//!
//! Persistence writes transactions and hands them to the monitor
//! through the ingest queue; the monitor scores each one against
//! per-user running statistics, suppresses duplicates, tracks
//! balances, and raises alerts through a notification sink. A
//! scheduler turns balances into loan and investment
//! recommendations on a timer.

pub mod alert;
pub mod balance;
pub mod config;
pub mod dedup;
pub mod error;
pub mod monitor;
pub mod queue;
pub mod recommend;
pub mod stats;
pub mod store;
pub mod types;
pub mod writer;

pub use alert::{AlertEvent, LogSink, NotificationSink, StoreSink};
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use monitor::{MonitorHandle, MonitorState, TransactionMonitor};
pub use queue::{ingest_queue, IngestConsumer, IngestProducer};
pub use store::TxnStore;
pub use types::{Direction, Transaction, UserRecord};
pub use writer::TransactionWriter;
