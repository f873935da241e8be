//! Transfer store
//!
//! Append-only record of money movements between two accounts. A transfer
//! record alone moves no money; the orchestrator pairs it with two entries and
//! two balance updates in one scope.

use super::executor::TransactionExecutor;
use super::ledger::Ledger;
use super::scope::Scope;
use super::traits::{paginate, TransferStore};
use crate::types::{LedgerError, NewTransfer, Transfer, TransferFilter, TransferId};
use chrono::Utc;

impl TransferStore for Scope<'_> {
    fn create_transfer(&mut self, params: NewTransfer) -> Result<Transfer, LedgerError> {
        self.ensure_active("create_transfer")?;

        let NewTransfer {
            from_account_id,
            to_account_id,
            amount,
        } = params;
        if from_account_id == to_account_id {
            return Err(LedgerError::invalid_transfer(
                from_account_id,
                to_account_id,
                "source and destination must differ",
            ));
        }
        if amount == 0 {
            return Err(LedgerError::invalid_transfer(
                from_account_id,
                to_account_id,
                "amount must be positive",
            ));
        }
        for account in [from_account_id, to_account_id] {
            if self.visible_account(account).is_none() {
                return Err(LedgerError::account_not_found(account));
            }
        }

        let transfer = Transfer {
            id: self.tables().next_transfer_id(),
            from_account_id,
            to_account_id,
            amount,
            created_at: Utc::now(),
        };
        self.transfers.push(transfer.clone());
        Ok(transfer)
    }

    fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        self.ensure_active("get_transfer")?;

        if let Some(transfer) = self.transfers.iter().find(|transfer| transfer.id == id) {
            return Ok(transfer.clone());
        }
        let tables = self.tables();
        let _gate = tables.read_gate();
        tables
            .transfers
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or(LedgerError::TransferNotFound { id })
    }

    fn list_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transfer>, LedgerError> {
        self.ensure_active("list_transfers")?;

        let tables = self.tables();
        let gate = tables.read_gate();
        let mut transfers: Vec<Transfer> = tables
            .transfers
            .iter()
            .filter(|row| filter.matches(row.value()))
            .map(|row| row.value().clone())
            .chain(
                self.transfers
                    .iter()
                    .filter(|transfer| filter.matches(transfer))
                    .cloned(),
            )
            .collect();
        drop(gate);
        transfers.sort_by_key(|transfer| transfer.id);

        Ok(paginate(transfers, limit, offset))
    }
}

impl TransferStore for Ledger {
    fn create_transfer(&mut self, params: NewTransfer) -> Result<Transfer, LedgerError> {
        TransactionExecutor::new(self.clone()).run(|scope| scope.create_transfer(params))
    }

    fn get_transfer(&self, id: TransferId) -> Result<Transfer, LedgerError> {
        let tables = self.tables();
        let _gate = tables.read_gate();
        tables
            .transfers
            .get(&id)
            .map(|row| row.value().clone())
            .ok_or(LedgerError::TransferNotFound { id })
    }

    fn list_transfers(
        &self,
        filter: TransferFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Transfer>, LedgerError> {
        let tables = self.tables();
        let gate = tables.read_gate();
        let mut transfers: Vec<Transfer> = tables
            .transfers
            .iter()
            .filter(|row| filter.matches(row.value()))
            .map(|row| row.value().clone())
            .collect();
        drop(gate);
        transfers.sort_by_key(|transfer| transfer.id);
        Ok(paginate(transfers, limit, offset))
    }
}
