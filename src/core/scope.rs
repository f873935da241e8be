//! Transactional scope
//!
//! A `Scope` is the unit of atomicity handed to a unit of work by the
//! [`TransactionExecutor`](super::TransactionExecutor). It implements the
//! same store traits as [`Ledger`], but every call participates in one
//! atomic unit:
//!
//! - writes are staged in the scope and only applied to the tables at commit
//! - the scope reads its own staged writes, and committed data otherwise
//! - row locks taken by the scope are held until commit or rollback
//!
//! Dropping a scope that was neither committed nor rolled back rolls it back,
//! so a panicking unit of work leaves no partial state and no held locks.

use super::context::TxContext;
use super::ledger::{Ledger, Tables, OWNER_CURRENCY_KEY};
use super::row_lock::ScopeId;
use crate::types::{Account, AccountId, Entry, LedgerError, Transfer};
use std::collections::HashMap;

/// Lifecycle of a scope
///
/// ```text
/// Active ──commit──> Committed
///   │
///   └──rollback──> RolledBack
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Active,
    Committed,
    RolledBack,
}

/// Staged change to an account row
#[derive(Debug, Clone)]
pub(crate) enum PendingRow {
    Written(Account),
    /// Keeps the deleted row so its unique key can be released at commit
    Deleted(Account),
}

/// Transaction-bound view of the ledger
#[derive(Debug)]
pub struct Scope<'a> {
    ledger: &'a Ledger,
    id: ScopeId,
    ctx: TxContext,
    state: ScopeState,

    pub(crate) accounts: HashMap<AccountId, PendingRow>,
    pub(crate) entries: Vec<Entry>,
    pub(crate) transfers: Vec<Transfer>,

    /// Unique keys reserved by accounts created in this scope
    reserved_keys: Vec<(String, String)>,
    held_locks: Vec<AccountId>,
}

impl<'a> Scope<'a> {
    /// Open a new scope against `ledger`
    pub(crate) fn begin(ledger: &'a Ledger, ctx: TxContext) -> Self {
        let id = ledger.tables().next_scope_id();
        tracing::trace!(scope = id, "scope opened");

        Scope {
            ledger,
            id,
            ctx,
            state: ScopeState::Active,
            accounts: HashMap::new(),
            entries: Vec::new(),
            transfers: Vec::new(),
            reserved_keys: Vec::new(),
            held_locks: Vec::new(),
        }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    pub(crate) fn ledger(&self) -> &'a Ledger {
        self.ledger
    }

    pub(crate) fn tables(&self) -> &'a Tables {
        self.ledger.tables()
    }

    /// Fail unless the scope is active and its context has not expired
    pub(crate) fn ensure_active(&self, operation: &str) -> Result<(), LedgerError> {
        if self.state != ScopeState::Active {
            return Err(LedgerError::internal(format!(
                "{} on scope {} after it ended",
                operation, self.id
            )));
        }
        self.ctx.check(operation)
    }

    /// Lock `id` for the rest of this scope and return the row as the scope sees it
    ///
    /// Unknown ids fail with `AccountNotFound` without entering the lock table.
    pub(crate) fn lock_account(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        if self.visible_account(id).is_none() {
            return Err(LedgerError::account_not_found(id));
        }

        let timeout = self.ledger.config().lock_timeout;
        let locks = &self.tables().locks;
        let acquired = locks.acquire(id, self.id, timeout, &self.ctx)?;
        if acquired {
            self.held_locks.push(id);
        }

        match self.visible_account(id) {
            Some(account) => Ok(account),
            None => {
                // Deleted by the scope we waited on.
                if acquired {
                    self.held_locks.retain(|held| *held != id);
                    locks.release(id, self.id);
                    locks.forget(id);
                }
                Err(LedgerError::account_not_found(id))
            }
        }
    }

    /// The account as this scope sees it: staged version first, committed otherwise
    pub(crate) fn visible_account(&self, id: AccountId) -> Option<Account> {
        match self.accounts.get(&id) {
            Some(PendingRow::Written(account)) => Some(account.clone()),
            Some(PendingRow::Deleted(_)) => None,
            None => {
                let tables = self.tables();
                let _gate = tables.read_gate();
                tables.accounts.get(&id).map(|row| row.value().clone())
            }
        }
    }

    pub(crate) fn stage_account(&mut self, account: Account) {
        self.accounts.insert(account.id, PendingRow::Written(account));
    }

    pub(crate) fn stage_delete(&mut self, account: Account) {
        self.accounts.insert(account.id, PendingRow::Deleted(account));
    }

    /// Reserve the `(owner, currency)` key for an account created in this scope
    pub(crate) fn reserve_unique_key(
        &mut self,
        owner: &str,
        currency: &str,
    ) -> Result<(), LedgerError> {
        let key = (owner.to_string(), currency.to_string());
        if !self.tables().owner_currency.insert(key.clone()) {
            return Err(LedgerError::unique_violation(
                OWNER_CURRENCY_KEY,
                format!("(owner, currency)=({}, {}) already exists", owner, currency),
            ));
        }
        self.reserved_keys.push(key);
        Ok(())
    }

    /// Whether an entry or transfer staged in this scope references `account`
    pub(crate) fn stages_reference_to(&self, account: AccountId) -> bool {
        self.entries.iter().any(|entry| entry.account_id == account)
            || self.transfers.iter().any(|transfer| {
                transfer.from_account_id == account || transfer.to_account_id == account
            })
    }

    /// Apply every staged write to the tables and release all locks
    ///
    /// On error the scope is rolled back before returning.
    pub(crate) fn commit(mut self) -> Result<(), LedgerError> {
        if let Err(error) = self.try_commit() {
            self.rollback();
            return Err(error);
        }
        Ok(())
    }

    fn try_commit(&mut self) -> Result<(), LedgerError> {
        self.ensure_active("commit")?;
        let tables = self.tables();
        let _gate = tables.write_gate();

        // Foreign keys: a referenced account may have been deleted by a scope
        // that committed after our insert-time check.
        for account_id in self
            .entries
            .iter()
            .map(|entry| entry.account_id)
            .chain(
                self.transfers
                    .iter()
                    .flat_map(|t| [t.from_account_id, t.to_account_id]),
            )
        {
            let staged = matches!(self.accounts.get(&account_id), Some(PendingRow::Written(_)));
            if !staged && !tables.accounts.contains_key(&account_id) {
                return Err(LedgerError::account_not_found(account_id));
            }
        }

        for row in self.accounts.values() {
            if let PendingRow::Deleted(account) = row {
                if tables.is_referenced(account.id) {
                    return Err(LedgerError::foreign_key_violation(
                        "entries_account_id_fkey",
                        format!("account {} is still referenced", account.id),
                    ));
                }
            }
        }

        let mut deleted = Vec::new();
        for (id, row) in self.accounts.drain() {
            match row {
                PendingRow::Written(account) => {
                    tables.accounts.insert(id, account);
                }
                PendingRow::Deleted(account) => {
                    tables.accounts.remove(&id);
                    tables.references.remove(&id);
                    tables
                        .owner_currency
                        .remove(&(account.owner, account.currency));
                    deleted.push(id);
                }
            }
        }
        for entry in self.entries.drain(..) {
            tables.add_reference(entry.account_id);
            tables.entries.insert(entry.id, entry);
        }
        for transfer in self.transfers.drain(..) {
            tables.add_reference(transfer.from_account_id);
            tables.add_reference(transfer.to_account_id);
            tables.transfers.insert(transfer.id, transfer);
        }

        // Reserved keys now belong to committed rows.
        self.reserved_keys.clear();
        self.state = ScopeState::Committed;
        self.release_locks();
        for id in deleted {
            tables.locks.forget(id);
        }

        tracing::debug!(scope = self.id, "scope committed");
        Ok(())
    }

    /// Discard every staged write and release all locks
    pub(crate) fn rollback(&mut self) {
        if self.state != ScopeState::Active {
            return;
        }

        let tables = self.tables();
        for key in self.reserved_keys.drain(..) {
            tables.owner_currency.remove(&key);
        }
        // Accounts created here never become rows, so neither do their locks.
        let uncommitted: Vec<AccountId> = self
            .accounts
            .keys()
            .copied()
            .filter(|id| !tables.accounts.contains_key(id))
            .collect();
        self.accounts.clear();
        self.entries.clear();
        self.transfers.clear();
        self.state = ScopeState::RolledBack;
        self.release_locks();
        for id in uncommitted {
            tables.locks.forget(id);
        }

        tracing::debug!(scope = self.id, "scope rolled back");
    }

    fn release_locks(&mut self) {
        let tables = self.tables();
        for account in self.held_locks.drain(..) {
            tables.locks.release(account, self.id);
        }
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        if self.state == ScopeState::Active {
            tracing::debug!(scope = self.id, "scope dropped while active, rolling back");
            self.rollback();
        }
    }
}
