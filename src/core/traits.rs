//! Store traits for accounts, entries and transfers
//!
//! These traits are implemented twice: by [`Ledger`](super::Ledger), where every
//! write auto-commits, and by [`Scope`](super::Scope), where every call joins the
//! enclosing transactional scope. Code written against the traits (the transfer
//! algorithm in particular) runs unchanged against either.
//!
//! Entry and transfer stores expose no update or delete: append-only is a
//! property of the interface, not a convention.

use crate::types::{
    Account, AccountId, Entry, EntryId, LedgerError, NewAccount, NewEntry, NewTransfer,
    Transfer, TransferFilter, TransferId,
};

/// Trait for managing account records
pub trait AccountStore {
    /// Open an account
    ///
    /// Fails with `UniqueViolation` if the `(owner, currency)` constraint is
    /// enforced and already taken, or `CheckViolation` for a negative balance.
    fn create_account(&mut self, params: NewAccount) -> Result<Account, LedgerError>;

    /// Get an account by id
    fn get_account(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Get an account and hold its exclusive row lock until the scope ends
    fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, LedgerError>;

    /// Overwrite an account balance
    fn update_balance(&mut self, id: AccountId, balance: i64) -> Result<Account, LedgerError>;

    /// Atomically add `delta` (possibly negative) to an account balance
    fn add_balance(&mut self, id: AccountId, delta: i64) -> Result<Account, LedgerError>;

    /// List an owner's accounts ordered by id
    fn list_accounts(
        &self,
        owner: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Account>, LedgerError>;

    /// Delete an account that no entry or transfer references
    fn delete_account(&mut self, id: AccountId) -> Result<(), LedgerError>;
}

/// Trait for appending and reading ledger entries
pub trait EntryStore {
    /// Append an entry
    fn create_entry(&mut self, params: NewEntry) -> Result<Entry, LedgerError>;

    /// Get an entry by id
    fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError>;

    /// List an account's entries ordered by id
    fn list_entries(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entry>, LedgerError>;
}

/// Trait for appending and reading transfer records
pub trait TransferStore {
    /// Append a transfer record
    fn create_transfer(&mut self, params: NewTransfer) -> Result<Transfer, LedgerError>;

    /// Get a transfer by id
    fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError>;

    /// List transfers matching `filter`, ordered by id
    fn list_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transfer>, LedgerError>;
}

/// Apply `limit`/`offset` to rows already sorted by id
pub(crate) fn paginate<T>(rows: Vec<T>, limit: usize, offset: usize) -> Vec<T> {
    rows.into_iter().skip(offset).take(limit).collect()
}
