//! Per-user running balances.
//!
//! RULE: `apply` is the only mutation path after hydration. The
//! tracker itself is owned by the consumer loop; the recommendation
//! scheduler sees balances only through the read-only [`BalanceView`].

use crate::types::{Direction, Transaction, UserId};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

type BalanceMap = HashMap<UserId, Decimal>;

// Every mutation is a single entry update, so a panic elsewhere
// cannot leave the map half-written. Poisoned locks are recovered.
fn write_map(lock: &RwLock<BalanceMap>) -> RwLockWriteGuard<'_, BalanceMap> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_map(lock: &RwLock<BalanceMap>) -> RwLockReadGuard<'_, BalanceMap> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct BalanceTracker {
    balances: Arc<RwLock<BalanceMap>>,
}

impl BalanceTracker {
    pub fn new() -> Self {
        Self {
            balances: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Net credit minus debit per user, computed once at startup.
    pub fn seed(&self, history: &[Transaction]) {
        let mut balances = write_map(&self.balances);
        for txn in history {
            let delta = signed_amount(txn);
            *balances.entry(txn.user_id.clone()).or_insert(Decimal::ZERO) += delta;
        }
    }

    /// Credit adds, debit subtracts. Creates the entry at zero
    /// baseline when absent. Write lock is held per transaction only.
    pub fn apply(&self, txn: &Transaction) {
        let mut balances = write_map(&self.balances);
        *balances.entry(txn.user_id.clone()).or_insert(Decimal::ZERO) += signed_amount(txn);
    }

    pub fn get(&self, user_id: &str) -> Option<Decimal> {
        read_map(&self.balances).get(user_id).copied()
    }

    /// Read-only handle for the scheduler thread.
    pub fn view(&self) -> BalanceView {
        BalanceView {
            balances: Arc::clone(&self.balances),
        }
    }
}

impl Default for BalanceTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn signed_amount(txn: &Transaction) -> Decimal {
    match txn.direction {
        Direction::Credit => txn.amount,
        Direction::Debit => -txn.amount,
    }
}

/// A cloneable, read-only window onto the balance map.
#[derive(Clone)]
pub struct BalanceView {
    balances: Arc<RwLock<BalanceMap>>,
}

impl BalanceView {
    /// Copy out the current balances. The scheduler iterates this
    /// snapshot so the consumer loop is never blocked for a full scan.
    pub fn snapshot(&self) -> Vec<(UserId, Decimal)> {
        read_map(&self.balances)
            .iter()
            .map(|(user, balance)| (user.clone(), *balance))
            .collect()
    }
}
