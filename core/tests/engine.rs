//! Integration tests: the monitor pipeline end to end.

use chrono::{Duration, Utc};
use finwatch_core::{
    ingest_queue, monitor, AlertEvent, Direction, MonitorConfig, MonitorError, MonitorResult,
    MonitorState, NotificationSink, StoreSink, Transaction, TransactionMonitor, TransactionWriter,
    TxnStore, UserRecord,
};
use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration as StdDuration;

/// Collects every dispatched alert for assertions.
struct CollectSink(Mutex<Vec<AlertEvent>>);

impl CollectSink {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Vec::new())))
    }

    fn events(&self) -> Vec<AlertEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl NotificationSink for CollectSink {
    fn dispatch(&self, event: &AlertEvent) -> MonitorResult<()> {
        self.0.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// Always fails, to prove dispatch is best-effort.
struct FailingSink;

impl NotificationSink for FailingSink {
    fn dispatch(&self, _event: &AlertEvent) -> MonitorResult<()> {
        Err(MonitorError::Config("sink down".into()))
    }
}

fn sink_handle(sink: &Arc<CollectSink>) -> Arc<dyn NotificationSink> {
    sink.clone()
}

fn txn(user: &str, amount: i64, direction: Direction) -> Transaction {
    Transaction {
        txn_id: format!("t-{user}-{amount}"),
        user_id: user.into(),
        amount: Decimal::from(amount),
        direction,
        narration: String::new(),
        timestamp: Utc::now(),
    }
}

fn insert_test_user(store: &TxnStore, id: &str) {
    store
        .insert_user(&UserRecord {
            user_id: id.into(),
            username: id.into(),
            first_name: "Test".into(),
            last_name: "User".into(),
            email: format!("{id}@example.com"),
            messaging_id: String::new(),
        })
        .unwrap();
}

fn seeded_store(history: &[Transaction]) -> TxnStore {
    let store = TxnStore::in_memory().unwrap();
    store.migrate().unwrap();
    insert_test_user(&store, "u1");
    for t in history {
        store.insert_transaction(t).unwrap();
    }
    store
}

/// Hydration walks Uninitialized → Running and loads baselines and
/// balances from the stored history.
#[test]
fn hydration_loads_baselines_and_balances() {
    let store = seeded_store(&[
        txn("u1", 100, Direction::Credit),
        txn("u1", 300, Direction::Credit),
        txn("u1", 150, Direction::Debit),
    ]);

    let mut engine = TransactionMonitor::new(&MonitorConfig::default(), CollectSink::new());
    assert_eq!(engine.state(), MonitorState::Uninitialized);

    engine.hydrate(&store).unwrap();
    assert_eq!(engine.state(), MonitorState::Running);

    let baseline = engine.statistics().baseline("u1", Direction::Credit).unwrap();
    assert_eq!(baseline.mean, Decimal::from(200));
    let balances = engine.balance_view().snapshot();
    assert_eq!(balances, vec![("u1".to_string(), Decimal::from(250))]);
}

/// A monitor hydrates exactly once.
#[test]
fn second_hydration_is_rejected() {
    let store = seeded_store(&[]);
    let mut engine = TransactionMonitor::new(&MonitorConfig::default(), CollectSink::new());
    engine.hydrate(&store).unwrap();
    assert!(engine.hydrate(&store).is_err());
}

/// A monitor that cannot load history stops instead of scoring blind.
#[test]
fn failed_hydration_is_fatal() {
    // No migration: the transaction table does not exist.
    let store = TxnStore::in_memory().unwrap();
    let mut engine = TransactionMonitor::new(&MonitorConfig::default(), CollectSink::new());

    assert!(engine.hydrate(&store).is_err());
    assert_eq!(engine.state(), MonitorState::Stopped);

    engine.process(&txn("u1", 100, Direction::Credit));
    assert_eq!(engine.statistics().tracked_pairs(), 0, "stopped monitor must not process");
}

/// An anomalous transaction raises a threshold alert scored against
/// the pre-update mean; its duplicate inside the window raises a
/// duplicate alert but no second threshold alert.
#[test]
fn pipeline_scores_before_updating() {
    let sink = CollectSink::new();
    let store = seeded_store(&[txn("u1", 100, Direction::Credit)]);
    let mut engine = TransactionMonitor::new(&MonitorConfig::default(), sink_handle(&sink));
    engine.hydrate(&store).unwrap();

    let outlier = txn("u1", 200, Direction::Credit);
    engine.process(&outlier);
    engine.process(&outlier);

    let events = sink.events();
    assert_eq!(events.len(), 2, "one threshold alert, one duplicate alert");
    assert_eq!(events[0].kind(), "threshold_exceeded");
    match &events[0] {
        AlertEvent::ThresholdExceeded { anomaly_score, .. } => {
            assert_eq!(*anomaly_score, Decimal::from(100))
        }
        other => panic!("unexpected event {other:?}"),
    }
    // The replay scores against the folded-in mean of 150 and passes
    // the threshold check, but trips the duplicate window.
    assert_eq!(events[1].kind(), "duplicate_transaction");
}

/// Statistics and balances update even for clean transactions that
/// raise nothing.
#[test]
fn clean_transactions_still_update_state() {
    let sink = CollectSink::new();
    let store = seeded_store(&[txn("u1", 100, Direction::Credit)]);
    let mut engine = TransactionMonitor::new(&MonitorConfig::default(), sink_handle(&sink));
    engine.hydrate(&store).unwrap();

    engine.process(&txn("u1", 110, Direction::Credit));

    assert!(sink.events().is_empty());
    let baseline = engine.statistics().baseline("u1", Direction::Credit).unwrap();
    assert_eq!(baseline.mean, Decimal::from(105));
    assert_eq!(
        engine.balance_view().snapshot(),
        vec![("u1".to_string(), Decimal::from(210))]
    );
}

/// A failing sink never stalls the pipeline.
#[test]
fn sink_failure_is_best_effort() {
    let store = seeded_store(&[txn("u1", 100, Direction::Credit)]);
    let mut engine = TransactionMonitor::new(&MonitorConfig::default(), Arc::new(FailingSink));
    engine.hydrate(&store).unwrap();

    engine.process(&txn("u1", 500, Direction::Credit));

    let baseline = engine.statistics().baseline("u1", Direction::Credit).unwrap();
    assert_eq!(baseline.count, 2, "transaction processed despite sink failure");
}

/// The store sink persists rendered alerts to the message log.
#[test]
fn store_sink_persists_alerts() {
    let db = format!("file:engine_sink_{}?mode=memory&cache=shared", line!());
    let store = TxnStore::open(&db).unwrap();
    store.migrate().unwrap();
    insert_test_user(&store, "u1");
    store.insert_transaction(&txn("u1", 100, Direction::Debit)).unwrap();

    let sink = Arc::new(StoreSink::new(TxnStore::open(&db).unwrap()));
    let mut engine = TransactionMonitor::new(&MonitorConfig::default(), sink);
    engine.hydrate(&store).unwrap();

    engine.process(&txn("u1", 500, Direction::Debit));

    let messages = store.messages_for_user("u1").unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].0, "threshold_exceeded");
    assert!(messages[0].1.contains("400%"), "body was: {}", messages[0].1);
}

/// Full threaded run: seed history through the gate, hydrate, feed
/// live traffic, and collect alerts from the worker threads.
#[test]
fn threaded_run_detects_anomalies_duplicates_and_recommendations() {
    let db = format!("file:engine_threaded_{}?mode=memory&cache=shared", line!());
    let store = TxnStore::open(&db).unwrap();
    store.migrate().unwrap();

    let config = MonitorConfig {
        recommendation_interval_secs: 1,
        poll_backoff_secs: 1,
        ..MonitorConfig::default()
    };

    insert_test_user(&store, "u1");

    let (producer, consumer) = ingest_queue();
    let writer = TransactionWriter::new(TxnStore::open(&db).unwrap(), producer);

    // History: steady 100-debit baseline. The balance stays below
    // the loan threshold for the whole run.
    let history: Vec<Transaction> = (0..5)
        .map(|i| {
            let mut t = txn("u1", 100, Direction::Debit);
            t.txn_id = format!("h{i}");
            t.timestamp = Utc::now() - Duration::days(1);
            t
        })
        .collect();
    writer.bulk_seed(&history).unwrap();

    let sink = CollectSink::new();
    let mut engine = TransactionMonitor::new(&config, sink_handle(&sink));
    engine.hydrate(&store).unwrap();
    let mut handle = monitor::spawn(engine, consumer, &config);

    // Far off the 100 mean, then replayed inside the window.
    writer
        .record("u1", Decimal::from(1000), Direction::Debit, "Outlier")
        .unwrap();
    writer
        .record("u1", Decimal::from(1000), Direction::Debit, "Outlier")
        .unwrap();

    thread::sleep(StdDuration::from_millis(1500));
    handle.stop();

    let events = sink.events();
    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert!(kinds.contains(&"threshold_exceeded"), "kinds: {kinds:?}");
    assert!(kinds.contains(&"duplicate_transaction"), "kinds: {kinds:?}");
    assert!(kinds.contains(&"loan_recommendation"), "kinds: {kinds:?}");
    assert_eq!(store.transaction_count().unwrap(), 7);
}
