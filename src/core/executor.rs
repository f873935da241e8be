//! Transaction executor
//!
//! Runs a unit of work inside a fresh [`Scope`] and commits it if the work
//! returns `Ok`, or rolls it back otherwise. The executor never retries;
//! retry decisions belong to the caller (see
//! [`TransferEngine`](super::TransferEngine)).

use super::context::TxContext;
use super::ledger::Ledger;
use super::scope::Scope;
use crate::types::LedgerError;

/// Runs closures atomically against a ledger
#[derive(Debug, Clone)]
pub struct TransactionExecutor {
    ledger: Ledger,
}

impl TransactionExecutor {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Run `work` in a scope with no deadline and no cancellation
    pub fn run<T, F>(&self, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<T, LedgerError>,
    {
        self.run_with(&TxContext::default(), work)
    }

    /// Run `work` in a scope bound to `ctx`
    ///
    /// # Returns
    ///
    /// * `Ok(T)` - the work succeeded and every write it made is committed
    /// * `Err(LedgerError)` - the work or the commit failed; no write is visible
    ///
    /// If `work` panics, the scope is rolled back while unwinding.
    pub fn run_with<T, F>(&self, ctx: &TxContext, work: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut Scope<'_>) -> Result<T, LedgerError>,
    {
        let mut scope = Scope::begin(&self.ledger, ctx.clone());
        let scope_id = scope.id();

        match work(&mut scope) {
            Ok(value) => {
                scope.commit().inspect_err(|error| {
                    tracing::debug!(scope = scope_id, %error, "commit failed");
                })?;
                Ok(value)
            }
            Err(error) => {
                scope.rollback();
                tracing::debug!(scope = scope_id, %error, "unit of work failed, rolled back");
                Err(error)
            }
        }
    }
}
