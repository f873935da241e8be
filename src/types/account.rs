//! Account-related types for the ledger
//!
//! This module defines the Account record and the parameters used to open
//! a new account.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account identifier
///
/// Assigned from the account sequence, starting at 1. The natural ordering of
/// identifiers is the global lock order used by transfers.
pub type AccountId = i64;

/// Account record
///
/// Balances are kept in minor currency units (cents for USD) so that all
/// arithmetic is exact integer arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The account ID
    pub id: AccountId,

    /// Name of the account holder
    pub owner: String,

    /// Current balance in minor currency units
    ///
    /// Never negative in any committed state.
    pub balance: i64,

    /// ISO currency code, e.g. `USD`
    pub currency: String,

    /// When the account was opened
    pub created_at: DateTime<Utc>,
}

/// Parameters for opening an account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub owner: String,
    pub balance: i64,
    pub currency: String,
}

impl NewAccount {
    /// Create account parameters
    ///
    /// # Arguments
    ///
    /// * `owner` - Name of the account holder
    /// * `balance` - Opening balance in minor units
    /// * `currency` - Currency code
    pub fn new(owner: impl Into<String>, balance: i64, currency: impl Into<String>) -> Self {
        NewAccount {
            owner: owner.into(),
            balance,
            currency: currency.into(),
        }
    }
}
