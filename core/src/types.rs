//! Shared primitive types used across the entire engine.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stable, unique identifier for a user.
pub type UserId = String;

/// A stable, unique identifier for a transaction.
pub type TxnId = String;

/// Flow classification of a transaction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Credit,
    Debit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(Self::Credit),
            "debit" => Some(Self::Debit),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single financial transaction. Immutable once enqueued.
///
/// Amounts are exact decimals — repeated accumulation into running
/// means and balances must not drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub txn_id: TxnId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub direction: Direction,
    pub narration: String,
    pub timestamp: DateTime<Utc>,
}

/// A user record as persisted in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub messaging_id: String,
}
