//! Transfer-related types for the ledger
//!
//! This module defines the persisted transfer record, the filter used to list
//! transfers, the request shape accepted from the batch driver, and the
//! result returned to callers of the transfer engine.

use super::account::{Account, AccountId};
use super::entry::Entry;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transfer identifier
pub type TransferId = i64;

/// Append-only record of money moved between two accounts
///
/// Invariants: `from_account_id != to_account_id` and `amount > 0`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,

    /// Amount moved in minor currency units (always positive)
    pub amount: u64,

    pub created_at: DateTime<Utc>,
}

/// Parameters for appending a transfer record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransfer {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: u64,
}

/// Filter for listing transfers
///
/// A transfer matches when its source equals `from_account_id` OR its
/// destination equals `to_account_id`. Leaving a side as `None` disables it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferFilter {
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,
}

impl TransferFilter {
    /// Match every transfer touching `account` on either side
    pub fn touching(account: AccountId) -> Self {
        TransferFilter {
            from_account_id: Some(account),
            to_account_id: Some(account),
        }
    }

    /// Check whether a transfer matches this filter
    pub fn matches(&self, transfer: &Transfer) -> bool {
        self.from_account_id == Some(transfer.from_account_id)
            || self.to_account_id == Some(transfer.to_account_id)
    }
}

/// A transfer request as received from an adapter (CSV row, RPC message, ...)
///
/// The amount is kept signed here: validation happens in the transfer engine,
/// which rejects non-positive amounts before any transactional scope opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct TransferRequest {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: i64,
}

/// Everything a successful transfer produced
///
/// Not persisted. The account snapshots are the post-update states as seen
/// inside the committing scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub transfer: Transfer,
    pub from_entry: Entry,
    pub to_entry: Entry,
    pub from_account: Account,
    pub to_account: Account,
}
