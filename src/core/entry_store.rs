//! Entry store
//!
//! Append-only record of balance movements. An entry references one account,
//! which must exist when the entry is written and still exist at commit.

use super::executor::TransactionExecutor;
use super::ledger::Ledger;
use super::scope::Scope;
use super::traits::{paginate, EntryStore};
use crate::types::{AccountId, Entry, EntryId, LedgerError, NewEntry};
use chrono::Utc;

impl EntryStore for Scope<'_> {
    fn create_entry(&mut self, params: NewEntry) -> Result<Entry, LedgerError> {
        self.ensure_active("create_entry")?;

        if self.visible_account(params.account_id).is_none() {
            return Err(LedgerError::account_not_found(params.account_id));
        }

        let entry = Entry {
            id: self.tables().next_entry_id(),
            account_id: params.account_id,
            amount: params.amount,
            created_at: Utc::now(),
        };
        self.entries.push(entry.clone());
        Ok(entry)
    }

    fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        self.ensure_active("get_entry")?;

        if let Some(entry) = self.entries.iter().find(|entry| entry.id == id) {
            return Ok(entry.clone());
        }
        let tables = self.tables();
        let _gate = tables.read_gate();
        tables
            .entries
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or(LedgerError::EntryNotFound { id })
    }

    fn list_entries(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entry>, LedgerError> {
        self.ensure_active("list_entries")?;

        let tables = self.tables();
        let gate = tables.read_gate();
        let mut entries: Vec<Entry> = tables
            .entries
            .iter()
            .filter(|row| row.account_id == account_id)
            .map(|row| row.value().clone())
            .chain(
                self.entries
                    .iter()
                    .filter(|entry| entry.account_id == account_id)
                    .cloned(),
            )
            .collect();
        drop(gate);
        entries.sort_by_key(|entry| entry.id);

        Ok(paginate(entries, limit, offset))
    }
}

impl EntryStore for Ledger {
    fn create_entry(&mut self, params: NewEntry) -> Result<Entry, LedgerError> {
        TransactionExecutor::new(self.clone()).run(|scope| scope.create_entry(params))
    }

    fn get_entry(&self, id: EntryId) -> Result<Entry, LedgerError> {
        let tables = self.tables();
        let _gate = tables.read_gate();
        tables
            .entries
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or(LedgerError::EntryNotFound { id })
    }

    fn list_entries(
        &self,
        account_id: AccountId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Entry>, LedgerError> {
        let tables = self.tables();
        let gate = tables.read_gate();
        let mut entries: Vec<Entry> = tables
            .entries
            .iter()
            .filter(|row| row.account_id == account_id)
            .map(|row| row.value().clone())
            .collect();
        drop(gate);
        entries.sort_by_key(|entry| entry.id);
        Ok(paginate(entries, limit, offset))
    }
}
