//! Ledger Engine Library
//! # Overview
//!
//! This library provides a transactional ledger of accounts, entries and
//! transfers, and a transfer engine that moves money between accounts
//! atomically under concurrent use.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, Entry, Transfer, LedgerError)
//! - [`core`] - Business logic components:
//!   - [`core::ledger`] - In-memory tables with row locks and a unique index
//!   - [`core::executor`] - Runs units of work atomically in a [`core::Scope`]
//!   - [`core::traits`] - Store traits shared by the ledger and its scopes
//!   - [`core::orchestrator`] - The transfer algorithm and retry policy
//! - [`io`] - CSV readers and account output
//! - [`strategy`] - Sync and async batch pipelines
//! - [`cli`] - CLI arguments parsing
//! - [`logging`] - tracing subscriber setup for the binary
//!
//! # Transfers
//!
//! A transfer writes one transfer record, a debit entry, a credit entry and
//! two balance updates, all or nothing:
//!
//! ```
//! use ledger_engine::{AccountStore, Ledger, NewAccount, TransferEngine};
//!
//! let mut ledger = Ledger::default();
//! let alice = ledger.create_account(NewAccount::new("alice", 100, "USD")).unwrap();
//! let bob = ledger.create_account(NewAccount::new("bob", 50, "USD")).unwrap();
//!
//! let engine = TransferEngine::new(ledger);
//! let result = engine.transfer(alice.id, bob.id, 30).unwrap();
//!
//! assert_eq!(result.from_account.balance, 70);
//! assert_eq!(result.to_account.balance, 80);
//! ```
//!
//! # Invariants
//!
//! - No committed balance is ever negative
//! - Every committed transfer has exactly two entries that sum to zero
//! - Transfers lock accounts in ascending id order, so they cannot deadlock

// Module declarations
pub mod cli;
pub mod core;
pub mod io;
pub mod logging;
pub mod strategy;
pub mod types;

pub use core::{
    AccountStore, EntryStore, Ledger, LedgerConfig, LedgerTotals, RetryPolicy, Scope,
    TransactionExecutor, TransferEngine, TransferStore, TxContext,
};
pub use io::write_accounts_csv;
pub use types::{
    Account, AccountId, Entry, EntryId, ErrorCode, ErrorKind, LedgerError, NewAccount, NewEntry,
    NewTransfer, Transfer, TransferFilter, TransferId, TransferRequest, TransferResult,
};
