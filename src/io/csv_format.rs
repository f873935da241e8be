//! CSV format handling for account and transfer inputs and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - Row structures for deserialization (`AccountCsvRecord`, `TransferCsvRecord`)
//! - Conversion from CSV rows to domain types via the `CsvRow` trait
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Account, AccountId, NewAccount, TransferRequest};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Write;

/// A CSV row type that converts into a domain value
///
/// Readers are generic over this trait so one reader serves both input files.
pub trait CsvRow: DeserializeOwned {
    type Output;

    /// Validate the raw row and convert it
    ///
    /// Returns an error message describing the first problem found.
    fn convert(self) -> Result<Self::Output, String>;
}

/// Row of the accounts input: `owner,balance,currency`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AccountCsvRecord {
    pub owner: String,
    pub balance: String,
    pub currency: String,
}

/// Row of the transfers input: `from,to,amount`
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct TransferCsvRecord {
    pub from: AccountId,
    pub to: AccountId,
    pub amount: String,
}

/// Parse an integer amount in minor units
fn parse_amount(raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| format!("Invalid amount '{}'", raw))
}

impl CsvRow for AccountCsvRecord {
    type Output = NewAccount;

    /// Only the shape of the row is checked here; the store enforces the
    /// balance and uniqueness constraints.
    fn convert(self) -> Result<NewAccount, String> {
        let owner = self.owner.trim();
        if owner.is_empty() {
            return Err("Account row requires an owner".to_string());
        }
        let currency = self.currency.trim();
        if currency.is_empty() {
            return Err(format!("Account row for '{}' requires a currency", owner));
        }
        let balance = parse_amount(&self.balance)?;

        Ok(NewAccount::new(owner, balance, currency))
    }
}

impl CsvRow for TransferCsvRecord {
    type Output = TransferRequest;

    fn convert(self) -> Result<TransferRequest, String> {
        let amount = parse_amount(&self.amount)
            .map_err(|e| format!("{} for transfer {} -> {}", e, self.from, self.to))?;

        Ok(TransferRequest {
            from: self.from,
            to: self.to,
            amount,
        })
    }
}

/// Write account states to CSV format
///
/// Writes accounts with columns: id, owner, currency, balance.
/// Accounts are sorted by id for deterministic output.
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[Account], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["id", "owner", "currency", "balance"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by_key(|account| account.id);

    for account in sorted_accounts {
        writer
            .write_record(&[
                account.id.to_string(),
                account.owner,
                account.currency,
                account.balance.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
