//! In-memory transactional ledger
//!
//! `Ledger` is the persistence layer the stores run against: three tables
//! (accounts, entries, transfers) held in `DashMap`s, per-table id sequences,
//! the `(owner, currency)` unique index, and the row-lock table.
//!
//! # Visibility
//!
//! Tables only ever contain committed rows. Writes made inside a
//! [`Scope`](super::Scope) are staged in the scope and applied here at
//! commit, which gives read-committed isolation to every reader.
//!
//! A commit applies its rows while holding the commit gate exclusively and
//! every committed read holds it shared, so a reader sees all of a commit or
//! none of it.
//!
//! # Auto-commit
//!
//! `Ledger` itself implements the store traits. Reads go straight to the
//! committed tables; each write runs in its own single-statement scope.

use super::config::LedgerConfig;
use super::row_lock::{RowLocks, ScopeId};
use crate::types::{Account, AccountId, Entry, EntryId, Transfer, TransferId};
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Name of the `(owner, currency)` unique constraint
pub(crate) const OWNER_CURRENCY_KEY: &str = "owner_currency_key";

/// Committed state shared by every handle and scope
#[derive(Debug)]
pub(crate) struct Tables {
    pub(crate) accounts: DashMap<AccountId, Account>,
    pub(crate) entries: DashMap<EntryId, Entry>,
    pub(crate) transfers: DashMap<TransferId, Transfer>,

    /// `(owner, currency)` pairs of committed and in-flight accounts
    pub(crate) owner_currency: DashSet<(String, String)>,

    /// Committed entries and transfer sides referencing each account
    pub(crate) references: DashMap<AccountId, u64>,

    pub(crate) locks: RowLocks,

    /// Commits hold it exclusively, committed reads hold it shared
    commit_gate: RwLock<()>,

    account_seq: AtomicI64,
    entry_seq: AtomicI64,
    transfer_seq: AtomicI64,
    scope_seq: AtomicU64,
}

impl Tables {
    fn new() -> Self {
        Tables {
            accounts: DashMap::new(),
            entries: DashMap::new(),
            transfers: DashMap::new(),
            owner_currency: DashSet::new(),
            references: DashMap::new(),
            locks: RowLocks::new(),
            commit_gate: RwLock::new(()),
            account_seq: AtomicI64::new(0),
            entry_seq: AtomicI64::new(0),
            transfer_seq: AtomicI64::new(0),
            scope_seq: AtomicU64::new(0),
        }
    }

    pub(crate) fn next_account_id(&self) -> AccountId {
        self.account_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn next_entry_id(&self) -> EntryId {
        self.entry_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn next_transfer_id(&self) -> TransferId {
        self.transfer_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn next_scope_id(&self) -> ScopeId {
        self.scope_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Whether any committed entry or transfer references `account`
    pub(crate) fn is_referenced(&self, account: AccountId) -> bool {
        self.references.get(&account).is_some_and(|count| *count > 0)
    }

    pub(crate) fn add_reference(&self, account: AccountId) {
        *self.references.entry(account).or_insert(0) += 1;
    }

    /// Hold off commits for the lifetime of the guard
    ///
    /// Not re-entrant: never take it while already holding it.
    pub(crate) fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.commit_gate
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclude every reader and other commit for the lifetime of the guard
    pub(crate) fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.commit_gate
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug)]
pub(crate) struct LedgerInner {
    pub(crate) tables: Tables,
    pub(crate) config: LedgerConfig,
}

/// Aggregates of the committed tables at one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerTotals {
    /// Sum of all balances, widened so the sum itself cannot overflow
    pub total_balance: i128,
    pub accounts: usize,
    pub entries: usize,
    pub transfers: usize,
}

/// Handle to an in-memory ledger
///
/// Cloning the handle is cheap and every clone sees the same data, so a
/// ledger can be shared across threads by cloning it into each one.
#[derive(Debug, Clone)]
pub struct Ledger {
    pub(crate) inner: Arc<LedgerInner>,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new(config: LedgerConfig) -> Self {
        Ledger {
            inner: Arc::new(LedgerInner {
                tables: Tables::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.inner.config
    }

    /// Number of transactional scopes opened so far
    ///
    /// Auto-commit writes count as one scope each; plain reads do not open a scope.
    pub fn transaction_count(&self) -> u64 {
        self.inner.tables.scope_seq.load(Ordering::SeqCst)
    }

    /// All committed accounts, sorted by id
    pub fn accounts(&self) -> Vec<Account> {
        let tables = self.tables();
        let _gate = tables.read_gate();
        let mut accounts: Vec<Account> = tables
            .accounts
            .iter()
            .map(|row| row.value().clone())
            .collect();
        accounts.sort_by_key(|account| account.id);
        accounts
    }

    /// Sum of all committed balances
    pub fn total_balance(&self) -> i128 {
        self.totals().total_balance
    }

    pub fn entry_count(&self) -> usize {
        self.totals().entries
    }

    pub fn transfer_count(&self) -> usize {
        self.totals().transfers
    }

    /// Balance sum and row counts taken from one consistent view
    pub fn totals(&self) -> LedgerTotals {
        let tables = self.tables();
        let _gate = tables.read_gate();
        LedgerTotals {
            total_balance: tables
                .accounts
                .iter()
                .map(|row| i128::from(row.balance))
                .sum(),
            accounts: tables.accounts.len(),
            entries: tables.entries.len(),
            transfers: tables.transfers.len(),
        }
    }

    pub(crate) fn tables(&self) -> &Tables {
        &self.inner.tables
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}
