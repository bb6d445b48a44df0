//! Alert events and the notification sink boundary.
//!
//! RULE: Detection code emits [`AlertEvent`]s ONLY.
//! How an alert reaches the user (database row, log line, chat
//! bridge) is a sink concern; the monitor never formats or sends
//! messages itself.

use crate::{
    error::MonitorResult,
    store::TxnStore,
    types::{Direction, UserId},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Every alert the engine can raise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertEvent {
    // ── Per-transaction alerts ─────────────────────
    ThresholdExceeded {
        user_id: UserId,
        direction: Direction,
        amount: Decimal,
        anomaly_score: Decimal,
    },
    DuplicateTransaction {
        user_id: UserId,
        direction: Direction,
        amount: Decimal,
    },

    // ── Scheduled recommendations ──────────────────
    LoanRecommendation {
        user_id: UserId,
        balance: Decimal,
    },
    InvestmentRecommendation {
        user_id: UserId,
        balance: Decimal,
    },
}

impl AlertEvent {
    /// Stable kind string, matches the serde tag. Persisted in the
    /// message log and used for counting in tests.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ThresholdExceeded { .. } => "threshold_exceeded",
            Self::DuplicateTransaction { .. } => "duplicate_transaction",
            Self::LoanRecommendation { .. } => "loan_recommendation",
            Self::InvestmentRecommendation { .. } => "investment_recommendation",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            Self::ThresholdExceeded { user_id, .. }
            | Self::DuplicateTransaction { user_id, .. }
            | Self::LoanRecommendation { user_id, .. }
            | Self::InvestmentRecommendation { user_id, .. } => user_id,
        }
    }

    /// Render the user-facing message body. Amounts and scores are
    /// rounded to two places for display only; the event keeps full
    /// precision.
    pub fn render_text(&self) -> String {
        match self {
            Self::ThresholdExceeded {
                direction,
                amount,
                anomaly_score,
                ..
            } => format!(
                "I have noticed a {} transaction of \u{20a6}{} on your account. \
                 This exceeds your all-time average by {}%.\n\
                 Please confirm if this transaction is legitimate.",
                direction,
                amount.round_dp(2),
                anomaly_score.round_dp(2),
            ),
            Self::DuplicateTransaction {
                direction, amount, ..
            } => format!(
                "Hi, how're you doing?\n\
                 It seems a duplicate {} transaction of \u{20a6}{} may have occurred on your account.\n\
                 Please confirm and reach out to your account officer if further help is required.",
                direction,
                amount.round_dp(2),
            ),
            Self::LoanRecommendation { .. } => {
                "Hi, you seem to be running low on balance. Would you like to apply for a loan?\n\n\
                 Checkout our loan options at https://example.com/loans"
                    .to_string()
            }
            Self::InvestmentRecommendation { .. } => {
                "Hi, you seem to be keeping a lot of money in the bank. Would you mind to invest \
                 in assets that tend to increase the value of your money?\n\n\
                 Checkout our investment options at https://example.com/investments"
                    .to_string()
            }
        }
    }
}

/// Where alerts go. Implementations must be shareable across the
/// consumer loop and the recommendation scheduler threads.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, event: &AlertEvent) -> MonitorResult<()>;
}

/// Persists each alert as a message-log row.
pub struct StoreSink {
    store: Mutex<TxnStore>,
}

impl StoreSink {
    pub fn new(store: TxnStore) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }
}

impl NotificationSink for StoreSink {
    fn dispatch(&self, event: &AlertEvent) -> MonitorResult<()> {
        let store = match self.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        store.insert_message(
            event.user_id(),
            event.kind(),
            &event.render_text(),
            chrono::Utc::now(),
        )
    }
}

/// Writes alerts to the log only. Used by the runner when no
/// database sink is wanted, and by tests.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&self, event: &AlertEvent) -> MonitorResult<()> {
        log::info!("alert [{}] for {}: {}", event.kind(), event.user_id(), event.render_text());
        Ok(())
    }
}
