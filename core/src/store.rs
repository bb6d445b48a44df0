//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! Other modules call store methods — they never execute SQL directly.
//!
//! Amounts are persisted as TEXT decimals and timestamps as RFC 3339
//! TEXT, so no precision is lost on the round trip.

use crate::{
    error::{MonitorError, MonitorResult},
    types::{Direction, Transaction, UserRecord},
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;
use std::str::FromStr;

pub struct TxnStore {
    conn: Connection,
}

impl TxnStore {
    /// Open (or create) the database at `path`. Accepts `file:` URIs,
    /// which the runner uses for shared in-memory databases.
    pub fn open(path: &str) -> MonitorResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> MonitorResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> MonitorResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Users ──────────────────────────────────────────────────

    pub fn insert_user(&self, user: &UserRecord) -> MonitorResult<()> {
        self.conn.execute(
            "INSERT INTO app_user (user_id, username, first_name, last_name, email, messaging_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                user.user_id,
                user.username,
                user.first_name,
                user.last_name,
                user.email,
                user.messaging_id,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn all_users(&self) -> MonitorResult<Vec<UserRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, username, first_name, last_name, email, messaging_id
             FROM app_user ORDER BY user_id ASC",
        )?;
        let users = stmt
            .query_map([], |row| {
                Ok(UserRecord {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    email: row.get(4)?,
                    messaging_id: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    // ── Transactions ───────────────────────────────────────────

    pub fn insert_transaction(&self, txn: &Transaction) -> MonitorResult<()> {
        self.conn.execute(
            "INSERT INTO txn (txn_id, user_id, amount, direction, narration, ts)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                txn.txn_id,
                txn.user_id,
                txn.amount.to_string(),
                txn.direction.as_str(),
                txn.narration,
                txn.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch the full transaction history, oldest first.
    /// Hydration reads this exactly once at startup.
    pub fn all_transactions(&self) -> MonitorResult<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT txn_id, user_id, amount, direction, narration, ts
             FROM txn ORDER BY ts ASC, txn_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(txn_id, user_id, amount, direction, narration, ts)| {
                Ok(Transaction {
                    txn_id,
                    user_id,
                    amount: parse_amount(&amount)?,
                    direction: parse_direction(&direction)?,
                    narration,
                    timestamp: parse_timestamp(&ts)?,
                })
            })
            .collect()
    }

    pub fn transaction_count(&self) -> MonitorResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM txn", [], |row| row.get(0))?;
        Ok(count)
    }

    // ── Message log ────────────────────────────────────────────

    pub fn insert_message(
        &self,
        user_id: &str,
        alert_kind: &str,
        body: &str,
        created_at: DateTime<Utc>,
    ) -> MonitorResult<()> {
        self.conn.execute(
            "INSERT INTO message (user_id, alert_kind, body, from_engine, created_at)
             VALUES (?1, ?2, ?3, 1, ?4)",
            params![user_id, alert_kind, body, created_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn messages_for_user(&self, user_id: &str) -> MonitorResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT alert_kind, body FROM message
             WHERE user_id = ?1 ORDER BY id ASC",
        )?;
        let messages = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    pub fn message_count(&self) -> MonitorResult<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM message", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn parse_amount(raw: &str) -> MonitorResult<Decimal> {
    Decimal::from_str(raw).map_err(|_| MonitorError::MalformedRow {
        column: "amount",
        value: raw.to_string(),
    })
}

fn parse_direction(raw: &str) -> MonitorResult<Direction> {
    Direction::parse(raw).ok_or_else(|| MonitorError::MalformedRow {
        column: "direction",
        value: raw.to_string(),
    })
}

fn parse_timestamp(raw: &str) -> MonitorResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| MonitorError::MalformedRow {
            column: "ts",
            value: raw.to_string(),
        })
}
