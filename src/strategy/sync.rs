//! Synchronous processing strategy
//!
//! This module provides a synchronous, single-threaded implementation of the
//! ProcessingStrategy trait. It orchestrates a run by coordinating between the
//! SyncReader (for CSV input) and the TransferEngine (for business logic).
//!
//! # Design
//!
//! The SyncProcessingStrategy focuses on orchestration, delegating:
//! - CSV parsing to `SyncReader` (iterator interface)
//! - Transfers to `TransferEngine`
//! - CSV output to `csv_format::write_accounts_csv` (format handling)
//!
//! Transfers are applied strictly in file order, so the output is fully
//! determined by the input.

use crate::core::{Ledger, LedgerConfig, TransferEngine};
use crate::io::csv_format::{AccountCsvRecord, TransferCsvRecord};
use crate::io::sync_reader::SyncReader;
use crate::strategy::{log_outcome, open_account, write_ledger, ProcessingStrategy, RunSummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use ledger_engine::core::LedgerConfig;
/// use ledger_engine::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let mut output = io::stdout();
///
/// strategy
///     .process(Path::new("accounts.csv"), Path::new("transfers.csv"), &mut output)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    ledger_config: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(ledger_config: LedgerConfig) -> Self {
        Self { ledger_config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Run the pipeline on the calling thread
    ///
    /// 1. Opens every account of the accounts file in file order
    /// 2. Streams the transfers file, applying each transfer through the engine
    /// 3. Writes the final account states
    ///
    /// Both files are opened before any account is created, so a missing
    /// transfers file fails the run without doing any work.
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let account_rows = SyncReader::<AccountCsvRecord>::new(accounts_path)?;
        let transfer_rows = SyncReader::<TransferCsvRecord>::new(transfers_path)?;

        let mut ledger = Ledger::new(self.ledger_config.clone());
        let mut summary = RunSummary::default();

        for row in account_rows {
            match row {
                Ok(params) => {
                    if open_account(&mut ledger, params) {
                        summary.accounts += 1;
                    }
                }
                Err(error) => tracing::warn!(file = %accounts_path.display(), %error, "skipping row"),
            }
        }

        let engine = TransferEngine::new(ledger);
        for row in transfer_rows {
            match row {
                Ok(request) => {
                    let result = engine.transfer(request.from, request.to, request.amount);
                    summary.record(log_outcome(&request, &result));
                }
                Err(error) => tracing::warn!(file = %transfers_path.display(), %error, "skipping row"),
            }
        }

        write_ledger(engine.ledger(), output)?;
        summary.log("sync");

        Ok(())
    }
}
