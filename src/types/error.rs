//! Error types for the ledger
//!
//! This module defines all error types that can occur in the ledger: store
//! constraint violations, lock contention, transfer rule violations, and the
//! I/O errors raised by the batch driver.
//!
//! # Error Categories
//!
//! Every error maps onto one [`ErrorKind`] through [`LedgerError::kind`]:
//!
//! - **InvalidArgument**: malformed or self-referential requests, constraint
//!   violations caused by the caller. Not retryable.
//! - **NotFound**: an identifier does not exist. Not retryable.
//! - **InsufficientFunds**: a debit would drive a balance negative.
//! - **Conflict**: lock timeouts, deadlines and uniqueness violations. Safe to
//!   retry the whole operation.
//! - **Internal**: anything else.
//!
//! Store errors additionally carry an [`ErrorCode`] (SQLSTATE-style) so that
//! adapters can classify them the same way they would classify database errors.

use super::{AccountId, EntryId, TransferId};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Coarse classification used by callers to decide how to react to an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    InsufficientFunds,
    Conflict,
    Internal,
}

impl ErrorKind {
    /// Whether retrying the whole operation may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Conflict)
    }

    /// Whether the caller is at fault (as opposed to contention or infrastructure)
    pub fn is_client_fault(self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidArgument | ErrorKind::NotFound | ErrorKind::InsufficientFunds
        )
    }
}

/// Persistence-layer error codes, using the PostgreSQL SQLSTATE values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ForeignKeyViolation,
    UniqueViolation,
    CheckViolation,
    LockNotAvailable,
    QueryCanceled,
}

impl ErrorCode {
    /// The five-character SQLSTATE for this code
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ForeignKeyViolation => "23503",
            ErrorCode::UniqueViolation => "23505",
            ErrorCode::CheckViolation => "23514",
            ErrorCode::LockNotAvailable => "55P03",
            ErrorCode::QueryCanceled => "57014",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the ledger
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error occurred while reading or writing files
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error occurred
    ///
    /// Recoverable: the malformed row is skipped.
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// Transfer rejected before any transactional scope was opened
    #[error("Invalid transfer from account {from} to account {to}: {reason}")]
    InvalidTransfer {
        from: AccountId,
        to: AccountId,
        reason: String,
    },

    #[error("Account {id} not found")]
    AccountNotFound { id: AccountId },

    #[error("Entry {id} not found")]
    EntryNotFound { id: EntryId },

    #[error("Transfer {id} not found")]
    TransferNotFound { id: TransferId },

    /// A debit would drive the balance below zero
    #[error("Insufficient funds in account {account}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        account: AccountId,
        balance: i64,
        requested: i64,
    },

    /// Balance arithmetic would overflow i64
    #[error("Balance overflow in {operation} for account {account}")]
    BalanceOverflow {
        operation: String,
        account: AccountId,
    },

    /// A write would persist a negative balance
    #[error("Balance of account {account} would become negative ({balance})")]
    CheckViolation { account: AccountId, balance: i64 },

    #[error("Duplicate key violates unique constraint \"{constraint}\": {detail}")]
    UniqueViolation { constraint: String, detail: String },

    #[error("Foreign key constraint \"{constraint}\" violated: {detail}")]
    ForeignKeyViolation { constraint: String, detail: String },

    /// The row lock could not be obtained within the configured timeout
    #[error("Timed out after {waited:?} waiting for lock on account {account}")]
    LockTimeout { account: AccountId, waited: Duration },

    /// The caller-supplied deadline passed
    #[error("Deadline exceeded during {operation}")]
    DeadlineExceeded { operation: String },

    /// The caller cancelled the enclosing scope
    #[error("Cancelled during {operation}")]
    Cancelled { operation: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Failure of a transfer, wrapping the underlying cause
    #[error("Transfer of {amount} from account {from} to account {to} failed: {source}")]
    Transfer {
        from: AccountId,
        to: AccountId,
        amount: i64,
        source: Box<LedgerError>,
    },
}

// Conversion from io::Error to LedgerError
impl From<std::io::Error> for LedgerError {
    fn from(error: std::io::Error) -> Self {
        LedgerError::IoError {
            message: error.to_string(),
        }
    }
}

// Conversion from csv::Error to LedgerError
impl From<csv::Error> for LedgerError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        LedgerError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl LedgerError {
    /// Classify this error
    ///
    /// Transfer-context wrappers delegate to their cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidTransfer { .. }
            | LedgerError::ParseError { .. }
            | LedgerError::BalanceOverflow { .. }
            | LedgerError::CheckViolation { .. }
            | LedgerError::ForeignKeyViolation { .. } => ErrorKind::InvalidArgument,
            LedgerError::FileNotFound { .. }
            | LedgerError::AccountNotFound { .. }
            | LedgerError::EntryNotFound { .. }
            | LedgerError::TransferNotFound { .. } => ErrorKind::NotFound,
            LedgerError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            LedgerError::UniqueViolation { .. }
            | LedgerError::LockTimeout { .. }
            | LedgerError::DeadlineExceeded { .. } => ErrorKind::Conflict,
            LedgerError::IoError { .. }
            | LedgerError::Cancelled { .. }
            | LedgerError::Internal { .. } => ErrorKind::Internal,
            LedgerError::Transfer { source, .. } => source.kind(),
        }
    }

    /// Persistence-layer code, if this error came from a store constraint
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            LedgerError::ForeignKeyViolation { .. } => Some(ErrorCode::ForeignKeyViolation),
            LedgerError::UniqueViolation { .. } => Some(ErrorCode::UniqueViolation),
            LedgerError::CheckViolation { .. } => Some(ErrorCode::CheckViolation),
            LedgerError::LockTimeout { .. } => Some(ErrorCode::LockNotAvailable),
            LedgerError::DeadlineExceeded { .. } | LedgerError::Cancelled { .. } => {
                Some(ErrorCode::QueryCanceled)
            }
            LedgerError::Transfer { source, .. } => source.code(),
            _ => None,
        }
    }

    /// The innermost error, with transfer context stripped
    pub fn root_cause(&self) -> &LedgerError {
        match self {
            LedgerError::Transfer { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an InvalidTransfer error
    pub fn invalid_transfer(from: AccountId, to: AccountId, reason: &str) -> Self {
        LedgerError::InvalidTransfer {
            from,
            to,
            reason: reason.to_string(),
        }
    }

    /// Create an AccountNotFound error
    pub fn account_not_found(id: AccountId) -> Self {
        LedgerError::AccountNotFound { id }
    }

    /// Create an InsufficientFunds error
    pub fn insufficient_funds(account: AccountId, balance: i64, requested: i64) -> Self {
        LedgerError::InsufficientFunds {
            account,
            balance,
            requested,
        }
    }

    /// Create a BalanceOverflow error
    pub fn balance_overflow(operation: &str, account: AccountId) -> Self {
        LedgerError::BalanceOverflow {
            operation: operation.to_string(),
            account,
        }
    }

    /// Create a CheckViolation error
    pub fn check_violation(account: AccountId, balance: i64) -> Self {
        LedgerError::CheckViolation { account, balance }
    }

    /// Create a UniqueViolation error
    pub fn unique_violation(constraint: &str, detail: String) -> Self {
        LedgerError::UniqueViolation {
            constraint: constraint.to_string(),
            detail,
        }
    }

    /// Create a ForeignKeyViolation error
    pub fn foreign_key_violation(constraint: &str, detail: String) -> Self {
        LedgerError::ForeignKeyViolation {
            constraint: constraint.to_string(),
            detail,
        }
    }

    /// Create a LockTimeout error
    pub fn lock_timeout(account: AccountId, waited: Duration) -> Self {
        LedgerError::LockTimeout { account, waited }
    }

    /// Create a DeadlineExceeded error
    pub fn deadline_exceeded(operation: &str) -> Self {
        LedgerError::DeadlineExceeded {
            operation: operation.to_string(),
        }
    }

    /// Create a Cancelled error
    pub fn cancelled(operation: &str) -> Self {
        LedgerError::Cancelled {
            operation: operation.to_string(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        LedgerError::Internal {
            message: message.into(),
        }
    }

    /// Create a ParseError error
    pub fn parse_error(line: Option<u64>, message: impl Into<String>) -> Self {
        LedgerError::ParseError {
            line,
            message: message.into(),
        }
    }

    /// Wrap an error with the context of the transfer that failed
    pub fn transfer_failed(from: AccountId, to: AccountId, amount: i64, source: LedgerError) -> Self {
        LedgerError::Transfer {
            from,
            to,
            amount,
            source: Box::new(source),
        }
    }
}
