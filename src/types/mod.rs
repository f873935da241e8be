//! Types module
//!
//! Contains core data structures used throughout the application.
//! This module organizes types into logical submodules:
//! - `account`: Account records and creation parameters
//! - `entry`: Append-only ledger entries
//! - `transfer`: Transfer records, requests and results
//! - `error`: Error types and their classification

pub mod account;
pub mod entry;
pub mod error;
pub mod transfer;

pub use account::{Account, AccountId, NewAccount};
pub use entry::{Entry, EntryId, NewEntry};
pub use error::{ErrorCode, ErrorKind, LedgerError};
pub use transfer::{
    NewTransfer, Transfer, TransferFilter, TransferId, TransferRequest, TransferResult,
};
