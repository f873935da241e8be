//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. Transfers are read in batches and each batch is
//! applied concurrently.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     ├── BatchProcessor (bounded concurrency on the blocking pool)
//!     └── TransferEngine
//!         └── Ledger (DashMap tables + row locks)
//! ```
//!
//! # Ordering
//!
//! - Accounts are opened one after another, in file order
//! - Batches are processed sequentially: batch N+1 is read only once every
//!   transfer of batch N has committed or failed
//! - Within a batch, transfers run concurrently and may commit in any order,
//!   so a transfer whose success depends on an earlier one in the same batch
//!   may fail with insufficient funds

use crate::core::{BatchProcessor, Ledger, LedgerConfig, TransferEngine};
use crate::io::async_reader::AsyncReader;
use crate::io::csv_format::{AccountCsvRecord, TransferCsvRecord};
use crate::strategy::{log_outcome, open_account, write_ledger, ProcessingStrategy, RunSummary};
use crate::types::LedgerError;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

/// Configuration for batch processing
///
/// Controls how transfers are batched and how many of them run at once.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of transfers per batch
    pub batch_size: usize,
    /// Maximum number of transfers in flight within a batch
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values are replaced by the defaults.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            tracing::warn!(
                default = default.batch_size,
                "invalid batch_size (0), using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            tracing::warn!(
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches (0), using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    config: BatchConfig,
    ledger_config: LedgerConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy with the specified configuration
    pub fn new(config: BatchConfig, ledger_config: LedgerConfig) -> Self {
        Self {
            config,
            ledger_config,
        }
    }

    async fn open(path: &Path) -> Result<AsyncReader<Compat<tokio::fs::File>>, LedgerError> {
        let file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LedgerError::FileNotFound {
                path: path.display().to_string(),
            },
            _ => LedgerError::IoError {
                message: format!("Failed to open file '{}': {}", path.display(), e),
            },
        })?;

        // csv-async reads through the futures traits
        Ok(AsyncReader::new(file.compat()))
    }

    async fn run(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
    ) -> Result<(Ledger, RunSummary), LedgerError> {
        let mut account_rows = Self::open(accounts_path).await?;
        let mut transfer_rows = Self::open(transfers_path).await?;

        let mut ledger = Ledger::new(self.ledger_config.clone());
        let mut summary = RunSummary::default();

        loop {
            let batch = account_rows
                .read_batch::<AccountCsvRecord>(self.config.batch_size)
                .await;
            if batch.is_empty() {
                break;
            }
            for params in batch {
                if open_account(&mut ledger, params) {
                    summary.accounts += 1;
                }
            }
        }

        let engine = Arc::new(TransferEngine::new(ledger));
        let processor = BatchProcessor::new(Arc::clone(&engine), self.config.max_concurrent_batches);

        loop {
            let batch = transfer_rows
                .read_batch::<TransferCsvRecord>(self.config.batch_size)
                .await;
            if batch.is_empty() {
                break;
            }

            // Wait for the whole batch before reading the next one
            for processed in processor.process_batch(batch).await {
                summary.record(log_outcome(&processed.request, &processed.result));
            }
        }

        Ok((engine.ledger().clone(), summary))
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Run the pipeline on a dedicated tokio runtime
    ///
    /// The runtime gets `max_concurrent_batches` workers and the same bound on
    /// blocking threads, which is where transfers run.
    fn process(
        &self,
        accounts_path: &Path,
        transfers_path: &Path,
        output: &mut dyn Write,
    ) -> Result<(), LedgerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| LedgerError::internal(format!("Failed to create tokio runtime: {}", e)))?;

        let (ledger, summary) = runtime.block_on(self.run(accounts_path, transfers_path))?;

        write_ledger(&ledger, output)?;
        summary.log("async");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn run(config: BatchConfig, accounts: &str, transfers: &str) -> Result<String, LedgerError> {
        let accounts = create_temp_csv(accounts);
        let transfers = create_temp_csv(transfers);
        let strategy = AsyncProcessingStrategy::new(config, LedgerConfig::default());
        let mut output = Vec::new();

        strategy.process(accounts.path(), transfers.path(), &mut output)?;
        Ok(String::from_utf8(output).unwrap())
    }

    #[rstest]
    #[case::defaults(BatchConfig::new(0, 0), 1000)]
    #[case::custom(BatchConfig::new(25, 3), 25)]
    fn test_batch_config(#[case] config: BatchConfig, #[case] expected_batch_size: usize) {
        assert_eq!(config.batch_size, expected_batch_size);
        assert!(config.max_concurrent_batches > 0);
    }

    #[test]
    fn test_async_strategy_processes_independent_transfers() {
        let output = run(
            BatchConfig::default(),
            "owner,balance,currency\nalice,100,USD\nbob,100,USD\ncarol,0,USD\ndave,0,USD\n",
            "from,to,amount\n1,3,10\n2,4,20\n1,4,5\n",
        )
        .unwrap();

        assert_eq!(
            output,
            "id,owner,currency,balance\n1,alice,USD,85\n2,bob,USD,80\n3,carol,USD,10\n4,dave,USD,25\n"
        );
    }

    #[test]
    fn test_async_strategy_orders_batches() {
        // With one transfer per batch, each transfer sees the previous one committed.
        let output = run(
            BatchConfig::new(1, 4),
            "owner,balance,currency\nalice,0,USD\nbob,50,USD\ncarol,0,USD\n",
            "from,to,amount\n2,1,50\n1,3,20\n3,2,20\n",
        )
        .unwrap();

        assert_eq!(
            output,
            "id,owner,currency,balance\n1,alice,USD,30\n2,bob,USD,20\n3,carol,USD,0\n"
        );
    }

    #[test]
    fn test_async_strategy_conserves_money_under_contention() {
        let transfers: String = std::iter::once("from,to,amount\n".to_string())
            .chain((0..200).map(|i| if i % 2 == 0 { "1,2,1\n" } else { "2,1,1\n" }.to_string()))
            .collect();

        let output = run(
            BatchConfig::new(50, 8),
            "owner,balance,currency\nalice,100,USD\nbob,100,USD\n",
            &transfers,
        )
        .unwrap();

        let total: i64 = output
            .lines()
            .skip(1)
            .map(|line| line.rsplit(',').next().unwrap().parse::<i64>().unwrap())
            .sum();
        assert_eq!(total, 200);
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let accounts = create_temp_csv("owner,balance,currency\n");
        let strategy = AsyncProcessingStrategy::new(BatchConfig::default(), LedgerConfig::default());
        let mut output = Vec::new();

        let result = strategy.process(accounts.path(), Path::new("nonexistent.csv"), &mut output);

        assert!(matches!(result, Err(LedgerError::FileNotFound { .. })));
        assert!(output.is_empty());
    }
}
