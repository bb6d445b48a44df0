//! Balance-driven loan and investment recommendations.
//!
//! Runs on its own timer thread against a read-only balance
//! snapshot. Per-user cooldown: once either recommendation is sent,
//! the user is quiet for the full cooldown before the next one, of
//! either kind.

use crate::{
    alert::AlertEvent,
    balance::BalanceView,
    config::MonitorConfig,
    types::UserId,
};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

pub struct RecommendationScheduler {
    view: BalanceView,
    last_sent: HashMap<UserId, DateTime<Utc>>,
    cooldown: Duration,
    low_balance: Decimal,
    high_balance: Decimal,
}

impl RecommendationScheduler {
    pub fn new(view: BalanceView, config: &MonitorConfig) -> Self {
        Self {
            view,
            last_sent: HashMap::new(),
            cooldown: config.recommendation_cooldown(),
            low_balance: config.low_balance_threshold,
            high_balance: config.high_balance_threshold,
        }
    }

    /// One scheduler tick. At most one recommendation per user:
    /// low balance wins over high balance, and a user inside the
    /// cooldown window (strictly less than one cooldown since the
    /// last send) is skipped entirely.
    pub fn scan(&mut self, now: DateTime<Utc>) -> Vec<AlertEvent> {
        let mut events = Vec::new();
        for (user_id, balance) in self.view.snapshot() {
            if let Some(sent_at) = self.last_sent.get(&user_id) {
                if now.signed_duration_since(*sent_at) < self.cooldown {
                    continue;
                }
            }

            let event = if balance < self.low_balance {
                AlertEvent::LoanRecommendation {
                    user_id: user_id.clone(),
                    balance,
                }
            } else if balance > self.high_balance {
                AlertEvent::InvestmentRecommendation {
                    user_id: user_id.clone(),
                    balance,
                }
            } else {
                continue;
            };

            self.last_sent.insert(user_id, now);
            events.push(event);
        }
        events
    }

    pub fn users_on_cooldown(&self) -> usize {
        self.last_sent.len()
    }
}
