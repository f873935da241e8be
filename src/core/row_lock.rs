//! Exclusive row locks for account records
//!
//! Each account row has at most one holder at a time: the scope that locked
//! it. Locks are re-entrant for their holder and are released only when the
//! holding scope commits or rolls back.
//!
//! Waiting is bounded by the ledger's lock timeout and by the caller's
//! [`TxContext`]. Nothing here detects deadlocks; callers that touch several
//! rows must acquire them in ascending id order.

use super::context::TxContext;
use crate::types::{AccountId, LedgerError};
use dashmap::DashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Identifier of a transactional scope
pub type ScopeId = u64;

/// Upper bound on a single condvar wait while a cancellation token is attached
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Default)]
struct RowLock {
    holder: Mutex<Option<ScopeId>>,
    released: Condvar,
}

/// Lock table keyed by account id
#[derive(Debug, Default)]
pub(crate) struct RowLocks {
    rows: DashMap<AccountId, Arc<RowLock>>,
}

impl RowLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock on `account` for `scope`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the lock was newly acquired
    /// * `Ok(false)` if `scope` already held it
    /// * `Err(LockTimeout)` if `timeout` elapsed first
    /// * `Err(DeadlineExceeded | Cancelled)` if the context expired while waiting
    pub(crate) fn acquire(
        &self,
        account: AccountId,
        scope: ScopeId,
        timeout: Duration,
        ctx: &TxContext,
    ) -> Result<bool, LedgerError> {
        // Clone the Arc out so the map shard is not held while blocking.
        let lock = Arc::clone(&self.rows.entry(account).or_default());

        let started = Instant::now();
        let mut holder = lock.holder.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            match *holder {
                None => {
                    *holder = Some(scope);
                    return Ok(true);
                }
                Some(current) if current == scope => return Ok(false),
                Some(_) => {}
            }

            ctx.check("row lock wait")?;
            let waited = started.elapsed();
            if waited >= timeout {
                return Err(LedgerError::lock_timeout(account, waited));
            }

            let mut wait = timeout - waited;
            if let Some(remaining) = ctx.remaining() {
                wait = wait.min(remaining);
            }
            if ctx.is_cancellable() {
                wait = wait.min(CANCEL_POLL_INTERVAL);
            }

            let (guard, _) = lock
                .released
                .wait_timeout(holder, wait)
                .unwrap_or_else(PoisonError::into_inner);
            holder = guard;
        }
    }

    /// Release the lock on `account` if `scope` holds it
    pub(crate) fn release(&self, account: AccountId, scope: ScopeId) {
        let Some(lock) = self.rows.get(&account).map(|row| Arc::clone(row.value())) else {
            return;
        };

        let mut holder = lock.holder.lock().unwrap_or_else(PoisonError::into_inner);
        if *holder == Some(scope) {
            *holder = None;
            lock.released.notify_all();
        }
    }

    /// Current holder of the lock on `account`
    pub(crate) fn holder(&self, account: AccountId) -> Option<ScopeId> {
        let lock = self.rows.get(&account).map(|row| Arc::clone(row.value()))?;
        let holder = lock.holder.lock().unwrap_or_else(PoisonError::into_inner);
        *holder
    }

    /// Drop the lock entry of an account that no longer exists
    ///
    /// Kept while another scope still waits on it; that scope finds the row
    /// gone and forgets the entry itself.
    pub(crate) fn forget(&self, account: AccountId) {
        self.rows
            .remove_if(&account, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.rows.len()
    }
}
