//! monitor-runner: headless runner for the finwatch transaction monitor.
//!
//! Usage:
//!   monitor-runner --seed 12345 --live 24 --db run.db
//!   monitor-runner --config monitor.json --feed-ms 100 --log-only

use anyhow::Result;
use chrono::{DateTime, Utc};
use finwatch_core::{
    ingest_queue, monitor, Direction, LogSink, MonitorConfig, NotificationSink, StoreSink,
    Transaction, TransactionMonitor, TransactionWriter, TxnStore, UserRecord,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use rust_decimal::Decimal;
use std::env;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Historical transactions bulk-seeded per demo user before the
/// monitor hydrates.
static DEMO_HISTORY: &str = include_str!("../data/demo_transactions.json");

#[derive(serde::Deserialize)]
struct SeedTxn {
    amount: Decimal,
    narration: String,
    timestamp: DateTime<Utc>,
    direction: Direction,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let live = parse_arg(&args, "--live", 24usize);
    let feed_ms = parse_arg(&args, "--feed-ms", 200u64);
    let log_only = args.iter().any(|a| a == "--log-only");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].as_str());

    println!("finwatch — monitor-runner");
    println!("  seed:     {seed}");
    println!("  live:     {live}");
    println!("  feed_ms:  {feed_ms}");
    println!("  db:       {db}");
    println!();

    let config = match config_path {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    config.validate()?;

    // For :memory: use SQLite shared-memory URI so the write path and
    // the alert sink see the same in-memory database.
    let db_effective: String = if db == ":memory:" {
        format!("file:finwatch_{}?mode=memory&cache=shared", unix_secs())
    } else {
        db.to_string()
    };
    let store = TxnStore::open(&db_effective)?;
    store.migrate()?;

    let users = seed_users(&store)?;
    println!("seeded {} demo users", users.len());

    let (producer, consumer) = ingest_queue();
    let writer = TransactionWriter::new(store, producer);

    let history: Vec<SeedTxn> = serde_json::from_str(DEMO_HISTORY)?;
    for user in &users {
        let txns: Vec<Transaction> = history
            .iter()
            .map(|entry| Transaction {
                txn_id: Uuid::new_v4().to_string(),
                user_id: user.user_id.clone(),
                amount: entry.amount,
                direction: entry.direction,
                narration: entry.narration.clone(),
                timestamp: entry.timestamp,
            })
            .collect();
        writer.bulk_seed(&txns)?;
    }

    let sink: Arc<dyn NotificationSink> = if log_only {
        Arc::new(LogSink)
    } else {
        Arc::new(StoreSink::new(TxnStore::open(&db_effective)?))
    };

    let mut engine = TransactionMonitor::new(&config, sink);
    engine.hydrate(writer.store())?;
    let mut handle = monitor::spawn(engine, consumer, &config);

    feed_live_traffic(&writer, &users, seed, live, feed_ms)?;

    // Let the consumer drain, then stop cleanly.
    thread::sleep(Duration::from_secs(1));
    handle.stop();

    print_summary(writer.store(), live)?;
    Ok(())
}

/// Random transactions in the seeded users' normal range, with the
/// occasional outlier and an immediate replay now and then.
fn feed_live_traffic(
    writer: &TransactionWriter,
    users: &[UserRecord],
    seed: u64,
    live: usize,
    feed_ms: u64,
) -> Result<()> {
    let mut rng = Pcg64::seed_from_u64(seed);
    for _ in 0..live {
        let user = &users[rng.gen_range(0..users.len())];
        let direction = if rng.gen_bool(0.5) {
            Direction::Credit
        } else {
            Direction::Debit
        };
        let amount = if rng.gen_bool(0.1) {
            Decimal::from(rng.gen_range(50_000..200_000i64))
        } else {
            Decimal::from(rng.gen_range(50..2_000i64))
        };
        writer.record(&user.user_id, amount, direction, "Live transfer")?;
        if rng.gen_bool(0.15) {
            writer.record(&user.user_id, amount, direction, "Live transfer")?;
        }
        thread::sleep(Duration::from_millis(feed_ms));
    }
    Ok(())
}

fn seed_users(store: &TxnStore) -> Result<Vec<UserRecord>> {
    let users = vec![
        demo_user("smarte", "Emmanuel", "Adebiyi"),
        demo_user("okobaba", "Christopher", "Ushie"),
        demo_user("nadia", "Arnold", "Ighiyiwisi"),
    ];
    for user in &users {
        store.insert_user(user)?;
    }
    Ok(users)
}

fn demo_user(username: &str, first_name: &str, last_name: &str) -> UserRecord {
    UserRecord {
        user_id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: format!("{username}@finwatch.dev"),
        messaging_id: String::new(),
    }
}

fn print_summary(store: &TxnStore, live: usize) -> Result<()> {
    println!();
    println!("=== RUN SUMMARY ===");
    println!("  live txns fed:  {live}");
    println!("  stored txns:    {}", store.transaction_count()?);
    println!("  alerts raised:  {}", store.message_count()?);
    for user in store.all_users()? {
        let messages = store.messages_for_user(&user.user_id)?;
        println!("  {:12} {} alert(s)", user.username, messages.len());
        for (kind, _) in &messages {
            println!("    - {kind}");
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn unix_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
