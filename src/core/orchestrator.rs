//! Transfer orchestration
//!
//! A transfer is five writes that must land together: the transfer record,
//! a debit entry, a credit entry, and the two balance updates. The
//! [`TransferEngine`] validates the request, runs [`execute_transfer`] inside
//! one executor scope, and applies the retry policy to the outcome.
//!
//! # Lock order
//!
//! Balances are always mutated in ascending account-id order, so two
//! transfers between the same pair of accounts, in either direction, lock the
//! rows in the same order and cannot deadlock.

use super::config::RetryPolicy;
use super::context::TxContext;
use super::executor::TransactionExecutor;
use super::ledger::Ledger;
use super::traits::{AccountStore, EntryStore, TransferStore};
use crate::types::{Account, AccountId, LedgerError, NewEntry, NewTransfer, TransferResult};

/// Check the preconditions of a transfer without touching any store
pub fn validate_transfer(from: AccountId, to: AccountId, amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::invalid_transfer(
            from,
            to,
            "amount must be positive",
        ));
    }
    if from == to {
        return Err(LedgerError::invalid_transfer(
            from,
            to,
            "source and destination must differ",
        ));
    }
    Ok(())
}

/// Run the transfer algorithm against `store`
///
/// `store` is normally a [`Scope`](super::Scope); the caller owns atomicity.
/// Expects a request that already passed [`validate_transfer`].
pub fn execute_transfer<S>(
    store: &mut S,
    from: AccountId,
    to: AccountId,
    amount: i64,
) -> Result<TransferResult, LedgerError>
where
    S: AccountStore + EntryStore + TransferStore,
{
    let transfer = store.create_transfer(NewTransfer {
        from_account_id: from,
        to_account_id: to,
        amount: amount.unsigned_abs(),
    })?;
    let from_entry = store.create_entry(NewEntry {
        account_id: from,
        amount: -amount,
    })?;
    let to_entry = store.create_entry(NewEntry {
        account_id: to,
        amount,
    })?;

    let (from_account, to_account) = if from < to {
        let from_account = debit(store, from, amount)?;
        let to_account = credit(store, to, amount)?;
        (from_account, to_account)
    } else {
        let to_account = credit(store, to, amount)?;
        let from_account = debit(store, from, amount)?;
        (from_account, to_account)
    };

    Ok(TransferResult {
        transfer,
        from_entry,
        to_entry,
        from_account,
        to_account,
    })
}

fn debit<S: AccountStore>(
    store: &mut S,
    account: AccountId,
    amount: i64,
) -> Result<Account, LedgerError> {
    let current = store.get_account_for_update(account)?;
    if current.balance < amount {
        return Err(LedgerError::insufficient_funds(
            account,
            current.balance,
            amount,
        ));
    }
    store.add_balance(account, -amount)
}

fn credit<S: AccountStore>(
    store: &mut S,
    account: AccountId,
    amount: i64,
) -> Result<Account, LedgerError> {
    store.add_balance(account, amount)
}

/// Moves money between accounts atomically
///
/// Cheap to clone; clones share the underlying ledger.
#[derive(Debug, Clone)]
pub struct TransferEngine {
    executor: TransactionExecutor,
    retry: RetryPolicy,
}

impl TransferEngine {
    /// Create an engine using the ledger's configured retry policy
    pub fn new(ledger: Ledger) -> Self {
        let retry = ledger.config().retry;
        Self {
            executor: TransactionExecutor::new(ledger),
            retry,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        self.executor.ledger()
    }

    /// Transfer `amount` from `from` to `to`
    ///
    /// # Returns
    ///
    /// * `Ok(TransferResult)` - the committed transfer, both entries and both
    ///   updated accounts
    /// * `Err(LedgerError::InvalidTransfer)` - rejected before any scope opened
    /// * `Err(LedgerError::Transfer)` - the scope failed; nothing was written
    pub fn transfer(
        &self,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<TransferResult, LedgerError> {
        self.transfer_with(&TxContext::default(), from, to, amount)
    }

    /// Transfer under a caller-supplied deadline or cancellation token
    pub fn transfer_with(
        &self,
        ctx: &TxContext,
        from: AccountId,
        to: AccountId,
        amount: i64,
    ) -> Result<TransferResult, LedgerError> {
        validate_transfer(from, to, amount)?;

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = self
                .executor
                .run_with(ctx, |scope| execute_transfer(scope, from, to, amount));

            match outcome {
                Ok(result) => {
                    tracing::debug!(
                        transfer = result.transfer.id,
                        from,
                        to,
                        amount,
                        attempt,
                        "transfer committed"
                    );
                    return Ok(result);
                }
                Err(error)
                    if error.kind().is_retryable()
                        && attempt < max_attempts
                        && ctx.check("transfer retry").is_ok() =>
                {
                    tracing::warn!(from, to, amount, attempt, %error, "transfer conflicted, retrying");
                    attempt += 1;
                }
                Err(error) => {
                    return Err(LedgerError::transfer_failed(from, to, amount, error));
                }
            }
        }
    }
}
