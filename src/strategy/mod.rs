//! Processing strategy module for batch runs of the ledger
//!
//! This module defines the Strategy pattern for complete processing pipelines:
//! open the accounts listed in one CSV file, apply the transfers listed in a
//! second one, and write the final account states. Different implementations
//! (synchronous, asynchronous batch) can be selected at runtime.

use crate::cli::StrategyType;
use crate::core::{AccountStore, Ledger, LedgerConfig};
use crate::types::{LedgerError, NewAccount, TransferRequest, TransferResult};
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete batch pipelines
pub trait ProcessingStrategy: Send + Sync {
    /// Open accounts, apply transfers and write the final account states
    ///
    /// # Arguments
    ///
    /// * `accounts_path` - CSV file with `owner,balance,currency` rows
    /// * `transfers_path` - CSV file with `from,to,amount` rows
    /// * `output` - Writer receiving `id,owner,currency,balance` rows
    ///
    /// # Returns
    ///
    /// * `Ok(())` if all processing completed (possibly with skipped rows)
    /// * `Err(LedgerError)` if a fatal error occurred (missing file, I/O error)
    ///
    /// Invalid rows, rejected accounts and failed transfers are logged and
    /// skipped; they never abort the run.
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError>;
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `config` - Optional configuration for async batch processing (ignored for sync)
/// * `ledger_config` - Configuration of the ledger each run creates
pub fn create_strategy(
    strategy_type: StrategyType,
    config: Option<BatchConfig>,
    ledger_config: LedgerConfig,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger_config)),
        StrategyType::Async => {
            let config = config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(config, ledger_config))
        }
    }
}

/// Open one account, logging and skipping it if the store rejects it
pub(crate) fn open_account(ledger: &mut Ledger, params: NewAccount) -> bool {
    let (owner, currency) = (params.owner.clone(), params.currency.clone());
    match ledger.create_account(params) {
        Ok(account) => {
            tracing::debug!(account = account.id, %owner, %currency, "account opened");
            true
        }
        Err(error) => {
            tracing::warn!(%owner, %currency, %error, "skipping account");
            false
        }
    }
}

/// Log a failed transfer; returns whether the transfer committed
pub(crate) fn log_outcome(
    request: &TransferRequest,
    result: &Result<TransferResult, LedgerError>,
) -> bool {
    match result {
        Ok(_) => true,
        Err(error) => {
            tracing::warn!(
                from = request.from,
                to = request.to,
                amount = request.amount,
                kind = ?error.kind(),
                %error,
                "transfer failed"
            );
            false
        }
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunSummary {
    pub(crate) accounts: usize,
    pub(crate) committed: usize,
    pub(crate) failed: usize,
}

impl RunSummary {
    pub(crate) fn record(&mut self, committed: bool) {
        if committed {
            self.committed += 1;
        } else {
            self.failed += 1;
        }
    }

    pub(crate) fn log(&self, strategy: &str) {
        tracing::info!(
            strategy,
            accounts = self.accounts,
            committed = self.committed,
            failed = self.failed,
            "run complete"
        );
    }
}

/// Write the ledger's accounts, mapping format errors to I/O errors
pub(crate) fn write_ledger(ledger: &Ledger, output: &mut dyn Write) -> Result<(), LedgerError> {
    crate::io::write_accounts_csv(&ledger.accounts(), output)
        .map_err(|message| LedgerError::IoError { message })
}
