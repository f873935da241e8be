//! Account store
//!
//! CRUD over account rows, for both the auto-commit [`Ledger`] handle and a
//! transaction-bound [`Scope`].
//!
//! Every write to an existing row takes that row's exclusive lock first, the
//! way an `UPDATE` or `DELETE` would in a database. Balance writes that would
//! persist a negative balance fail with `CheckViolation`; arithmetic is checked.

use super::executor::TransactionExecutor;
use super::ledger::Ledger;
use super::scope::{PendingRow, Scope};
use super::traits::{paginate, AccountStore};
use crate::types::{Account, AccountId, LedgerError, NewAccount};
use chrono::Utc;

impl AccountStore for Scope<'_> {
    fn create_account(&mut self, params: NewAccount) -> Result<Account, LedgerError> {
        self.ensure_active("create_account")?;

        let id = self.tables().next_account_id();
        if params.balance < 0 {
            return Err(LedgerError::check_violation(id, params.balance));
        }
        if self.ledger().config().unique_owner_currency {
            self.reserve_unique_key(&params.owner, &params.currency)?;
        }

        let account = Account {
            id,
            owner: params.owner,
            balance: params.balance,
            currency: params.currency,
            created_at: Utc::now(),
        };
        self.stage_account(account.clone());

        tracing::debug!(account = id, owner = %account.owner, currency = %account.currency, "account created");
        Ok(account)
    }

    fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.ensure_active("get_account")?;
        self.visible_account(id)
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        self.ensure_active("get_account_for_update")?;
        self.lock_account(id)
    }

    fn update_balance(&mut self, id: AccountId, balance: i64) -> Result<Account, LedgerError> {
        self.ensure_active("update_balance")?;
        if balance < 0 {
            return Err(LedgerError::check_violation(id, balance));
        }

        let mut account = self.lock_account(id)?;
        account.balance = balance;
        self.stage_account(account.clone());
        Ok(account)
    }

    fn add_balance(&mut self, id: AccountId, delta: i64) -> Result<Account, LedgerError> {
        self.ensure_active("add_balance")?;

        let mut account = self.lock_account(id)?;
        let balance = account
            .balance
            .checked_add(delta)
            .ok_or_else(|| LedgerError::balance_overflow("add_balance", id))?;
        if balance < 0 {
            return Err(LedgerError::check_violation(id, balance));
        }

        account.balance = balance;
        self.stage_account(account.clone());
        Ok(account)
    }

    fn list_accounts(
        &self,
        owner: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Account>, LedgerError> {
        self.ensure_active("list_accounts")?;

        // Committed rows this scope has not touched, then this scope's own versions.
        let tables = self.tables();
        let gate = tables.read_gate();
        let mut accounts: Vec<Account> = tables
            .accounts
            .iter()
            .filter(|row| row.owner == owner && !self.accounts.contains_key(row.key()))
            .map(|row| row.value().clone())
            .collect();
        drop(gate);
        accounts.extend(self.accounts.values().filter_map(|row| match row {
            PendingRow::Written(account) if account.owner == owner => Some(account.clone()),
            _ => None,
        }));
        accounts.sort_by_key(|account| account.id);

        Ok(paginate(accounts, limit, offset))
    }

    fn delete_account(&mut self, id: AccountId) -> Result<(), LedgerError> {
        self.ensure_active("delete_account")?;

        let account = self.lock_account(id)?;
        if self.tables().is_referenced(id) || self.stages_reference_to(id) {
            return Err(LedgerError::foreign_key_violation(
                "entries_account_id_fkey",
                format!("account {} is still referenced", id),
            ));
        }

        self.stage_delete(account);
        Ok(())
    }
}

impl AccountStore for Ledger {
    fn create_account(&mut self, params: NewAccount) -> Result<Account, LedgerError> {
        TransactionExecutor::new(self.clone()).run(|scope| scope.create_account(params))
    }

    fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let tables = self.tables();
        let _gate = tables.read_gate();
        tables
            .accounts
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or_else(|| LedgerError::account_not_found(id))
    }

    /// Waits for any scope holding the row to finish; the lock is released on return.
    fn get_account_for_update(&mut self, id: AccountId) -> Result<Account, LedgerError> {
        TransactionExecutor::new(self.clone()).run(|scope| scope.get_account_for_update(id))
    }

    fn update_balance(&mut self, id: AccountId, balance: i64) -> Result<Account, LedgerError> {
        TransactionExecutor::new(self.clone()).run(|scope| scope.update_balance(id, balance))
    }

    fn add_balance(&mut self, id: AccountId, delta: i64) -> Result<Account, LedgerError> {
        TransactionExecutor::new(self.clone()).run(|scope| scope.add_balance(id, delta))
    }

    fn list_accounts(
        &self,
        owner: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Account>, LedgerError> {
        let tables = self.tables();
        let gate = tables.read_gate();
        let mut accounts: Vec<Account> = tables
            .accounts
            .iter()
            .filter(|row| row.owner == owner)
            .map(|row| row.value().clone())
            .collect();
        drop(gate);
        accounts.sort_by_key(|account| account.id);
        Ok(paginate(accounts, limit, offset))
    }

    fn delete_account(&mut self, id: AccountId) -> Result<(), LedgerError> {
        TransactionExecutor::new(self.clone()).run(|scope| scope.delete_account(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LedgerConfig;
    use crate::core::traits::{EntryStore, TransferStore};
    use crate::types::{ErrorCode, NewEntry, NewTransfer};
    use rstest::rstest;

    fn open(ledger: &mut Ledger, owner: &str, balance: i64, currency: &str) -> Account {
        ledger
            .create_account(NewAccount::new(owner, balance, currency))
            .unwrap()
    }

    #[test]
    fn test_create_account() {
        let mut ledger = Ledger::default();

        let account = open(&mut ledger, "alice", 100, "USD");

        assert_eq!(account.id, 1);
        assert_eq!(account.owner, "alice");
        assert_eq!(account.balance, 100);
        assert_eq!(account.currency, "USD");
        assert_eq!(ledger.get_account(account.id).unwrap(), account);
    }

    #[test]
    fn test_create_account_rejects_duplicate_owner_currency() {
        let mut ledger = Ledger::default();
        open(&mut ledger, "alice", 100, "USD");

        let error = ledger
            .create_account(NewAccount::new("alice", 5, "USD"))
            .unwrap_err();

        assert_eq!(error.code(), Some(ErrorCode::UniqueViolation));
        assert_eq!(ledger.accounts().len(), 1);
        // Another currency for the same owner is fine.
        open(&mut ledger, "alice", 5, "EUR");
    }

    #[test]
    fn test_duplicate_owner_currency_allowed_when_not_enforced() {
        let config = LedgerConfig {
            unique_owner_currency: false,
            ..LedgerConfig::default()
        };
        let mut ledger = Ledger::new(config);

        open(&mut ledger, "alice", 1, "USD");
        open(&mut ledger, "alice", 2, "USD");

        assert_eq!(ledger.list_accounts("alice", 10, 0).unwrap().len(), 2);
    }

    #[test]
    fn test_create_account_rejects_negative_balance() {
        let mut ledger = Ledger::default();

        let error = ledger
            .create_account(NewAccount::new("alice", -1, "USD"))
            .unwrap_err();

        assert_eq!(error.code(), Some(ErrorCode::CheckViolation));
        // The reserved unique key was not taken.
        open(&mut ledger, "alice", 0, "USD");
    }

    #[test]
    fn test_get_missing_account() {
        let ledger = Ledger::default();
        assert_eq!(
            ledger.get_account(42),
            Err(LedgerError::account_not_found(42))
        );
    }

    #[test]
    fn test_update_balance() {
        let mut ledger = Ledger::default();
        let account = open(&mut ledger, "alice", 100, "USD");

        let updated = ledger.update_balance(account.id, 250).unwrap();

        assert_eq!(updated.id, account.id);
        assert_eq!(updated.owner, account.owner);
        assert_eq!(updated.balance, 250);
        assert_eq!(updated.currency, account.currency);
        assert_eq!(updated.created_at, account.created_at);
        assert_eq!(ledger.get_account(account.id).unwrap(), updated);
    }

    #[rstest]
    #[case::credit(100, 30, Ok(130))]
    #[case::debit(100, -30, Ok(70))]
    #[case::debit_to_zero(100, -100, Ok(0))]
    #[case::negative_result(100, -101, Err(Some(ErrorCode::CheckViolation)))]
    #[case::overflow(i64::MAX, 1, Err(None))]
    fn test_add_balance(
        #[case] initial: i64,
        #[case] delta: i64,
        #[case] expected: Result<i64, Option<ErrorCode>>,
    ) {
        let mut ledger = Ledger::default();
        let account = open(&mut ledger, "alice", initial, "USD");

        let result = ledger
            .add_balance(account.id, delta)
            .map(|account| account.balance)
            .map_err(|error| error.code());

        assert_eq!(result, expected);
        let stored = ledger.get_account(account.id).unwrap().balance;
        assert_eq!(stored, expected.unwrap_or(initial));
    }

    #[test]
    fn test_list_accounts_paginates_by_owner() {
        let config = LedgerConfig {
            unique_owner_currency: false,
            ..LedgerConfig::default()
        };
        let mut ledger = Ledger::new(config);
        for balance in 0..10 {
            open(&mut ledger, "alice", balance, "USD");
            open(&mut ledger, "bob", balance, "USD");
        }

        let page = ledger.list_accounts("alice", 5, 5).unwrap();

        assert_eq!(page.len(), 5);
        assert!(page.iter().all(|account| account.owner == "alice"));
        let balances: Vec<i64> = page.iter().map(|account| account.balance).collect();
        assert_eq!(balances, vec![5, 6, 7, 8, 9]);
    }

    #[test]
    fn test_delete_account() {
        let mut ledger = Ledger::default();
        let account = open(&mut ledger, "alice", 100, "USD");

        ledger.delete_account(account.id).unwrap();

        assert_eq!(
            ledger.get_account(account.id),
            Err(LedgerError::account_not_found(account.id))
        );
        // The unique key is released with the row.
        open(&mut ledger, "alice", 0, "USD");
    }

    #[test]
    fn test_delete_referenced_account_is_rejected() {
        let mut ledger = Ledger::default();
        let account = open(&mut ledger, "alice", 100, "USD");
        ledger
            .create_entry(NewEntry {
                account_id: account.id,
                amount: 10,
            })
            .unwrap();

        let error = ledger.delete_account(account.id).unwrap_err();

        assert_eq!(error.code(), Some(ErrorCode::ForeignKeyViolation));
        assert!(ledger.get_account(account.id).is_ok());
    }

    #[test]
    fn test_delete_transfer_destination_is_rejected() {
        let mut ledger = Ledger::default();
        let alice = open(&mut ledger, "alice", 100, "USD");
        let bob = open(&mut ledger, "bob", 0, "USD");
        ledger
            .create_transfer(NewTransfer {
                from_account_id: alice.id,
                to_account_id: bob.id,
                amount: 10,
            })
            .unwrap();

        let error = ledger.delete_account(bob.id).unwrap_err();

        assert_eq!(error.code(), Some(ErrorCode::ForeignKeyViolation));
    }

    #[rstest]
    #[case::for_update("get_account_for_update")]
    #[case::update_balance("update_balance")]
    #[case::add_balance("add_balance")]
    #[case::delete("delete_account")]
    fn test_missing_account_is_not_locked(#[case] operation: &str) {
        let mut ledger = Ledger::default();
        open(&mut ledger, "alice", 100, "USD");

        let result = match operation {
            "get_account_for_update" => ledger.get_account_for_update(42).map(|_| ()),
            "update_balance" => ledger.update_balance(42, 1).map(|_| ()),
            "add_balance" => ledger.add_balance(42, 1).map(|_| ()),
            _ => ledger.delete_account(42),
        };

        assert_eq!(result, Err(LedgerError::account_not_found(42)));
        assert_eq!(ledger.tables().locks.tracked(), 0);
    }

    #[test]
    fn test_rolled_back_account_leaves_no_lock() {
        let ledger = Ledger::default();
        let executor = TransactionExecutor::new(ledger.clone());

        let result: Result<(), LedgerError> = executor.run(|scope| {
            let account = scope.create_account(NewAccount::new("alice", 10, "USD"))?;
            scope.add_balance(account.id, 5)?;
            Err(LedgerError::internal("abort"))
        });

        assert!(result.is_err());
        assert_eq!(ledger.tables().locks.tracked(), 0);
    }

    #[test]
    fn test_deleted_account_leaves_no_lock() {
        let mut ledger = Ledger::default();
        let account = open(&mut ledger, "alice", 100, "USD");
        ledger.add_balance(account.id, 1).unwrap();
        assert_eq!(ledger.tables().locks.tracked(), 1);

        ledger.delete_account(account.id).unwrap();

        assert_eq!(ledger.tables().locks.tracked(), 0);
    }

    #[test]
    fn test_scope_reads_its_own_writes_only() {
        let mut ledger = Ledger::default();
        let account = open(&mut ledger, "alice", 100, "USD");
        let executor = TransactionExecutor::new(ledger.clone());

        executor
            .run(|scope| {
                scope.add_balance(account.id, 50)?;
                assert_eq!(scope.get_account(account.id)?.balance, 150);
                // Not visible outside the scope before commit.
                assert_eq!(ledger.get_account(account.id)?.balance, 100);
                Ok(())
            })
            .unwrap();

        assert_eq!(ledger.get_account(account.id).unwrap().balance, 150);
    }

    #[test]
    fn test_scope_lists_staged_accounts() {
        let mut ledger = Ledger::default();
        open(&mut ledger, "alice", 1, "USD");
        let executor = TransactionExecutor::new(ledger.clone());

        executor
            .run(|scope| {
                scope.create_account(NewAccount::new("alice", 2, "EUR"))?;
                let listed = scope.list_accounts("alice", 10, 0)?;
                assert_eq!(listed.len(), 2);
                assert_eq!(ledger.list_accounts("alice", 10, 0)?.len(), 1);
                Ok(())
            })
            .unwrap();
    }
}
