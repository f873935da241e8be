//! Ledger entry types
//!
//! An entry records one account's side of one transfer. Entries are
//! append-only: once written they are never updated or deleted.

use super::account::AccountId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry identifier
pub type EntryId = i64;

/// Immutable signed-amount record of one account's side of a transfer
///
/// `amount` is negative on the debited side and positive on the credited side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub account_id: AccountId,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

/// Parameters for appending an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewEntry {
    pub account_id: AccountId,
    pub amount: i64,
}
