//! Core business logic module
//!
//! This module contains the transactional ledger and the transfer engine:
//! - `ledger` - In-memory tables, sequences and unique index
//! - `row_lock` - Exclusive, re-entrant row locks with bounded waits
//! - `scope` - Transactional scope with staged writes
//! - `executor` - Runs units of work atomically
//! - `traits` - Store traits implemented by `Ledger` and `Scope`
//! - `orchestrator` - The transfer algorithm and its retry policy
//! - `async` - Concurrent batch driver on top of tokio

pub mod r#async;
pub mod config;
pub mod context;
pub mod executor;
pub mod ledger;
pub mod orchestrator;
pub mod row_lock;
pub mod scope;
pub mod traits;

mod account_store;
mod entry_store;
mod transfer_store;

pub use config::{LedgerConfig, RetryPolicy};
pub use context::TxContext;
pub use executor::TransactionExecutor;
pub use ledger::{Ledger, LedgerTotals};
pub use orchestrator::{execute_transfer, validate_transfer, TransferEngine};
pub use r#async::{BatchProcessor, ProcessingResult};
pub use row_lock::ScopeId;
pub use scope::{Scope, ScopeState};
pub use traits::{AccountStore, EntryStore, TransferStore};
