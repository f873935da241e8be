use crate::core::LedgerConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Open accounts and apply money transfers between them
#[derive(Parser, Debug)]
#[command(name = "ledger-engine")]
#[command(about = "Open accounts and apply money transfers between them", long_about = None)]
pub struct CliArgs {
    /// Accounts CSV file (owner,balance,currency)
    #[arg(value_name = "ACCOUNTS", help = "Path to the accounts CSV file")]
    pub accounts_file: PathBuf,

    /// Transfers CSV file (from,to,amount)
    #[arg(value_name = "TRANSFERS", help = "Path to the transfers CSV file")]
    pub transfers_file: PathBuf,

    /// Processing strategy
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "sync",
        help = "Processing strategy: 'sync' applies transfers in file order, 'async' applies each batch concurrently"
    )]
    pub strategy: StrategyType,

    /// Number of transfers per batch (async mode only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Number of transfers per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Maximum number of transfers in flight (async mode only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of transfers processing concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Row lock wait bound in milliseconds
    #[arg(
        long = "lock-timeout-ms",
        value_name = "MILLIS",
        help = "How long a transfer waits for an account lock (default: 5000)"
    )]
    pub lock_timeout_ms: Option<u64>,

    /// Attempts per transfer when it hits a conflict
    #[arg(
        long = "max-attempts",
        value_name = "COUNT",
        help = "Attempts per transfer, retrying lock timeouts and other conflicts (default: 1)"
    )]
    pub max_attempts: Option<u32>,

    /// Allow several accounts with the same owner and currency
    #[arg(long = "allow-duplicate-currency")]
    pub allow_duplicate_currency: bool,
}

/// Available processing strategies
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Create a BatchConfig from CLI arguments
    ///
    /// Uses the provided values or falls back to defaults. Zero values are
    /// replaced by the defaults with a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        if self.batch_size.is_some() || self.max_concurrent_batches.is_some() {
            let default = BatchConfig::default();
            BatchConfig::new(
                self.batch_size.unwrap_or(default.batch_size),
                self.max_concurrent_batches
                    .unwrap_or(default.max_concurrent_batches),
            )
        } else {
            BatchConfig::default()
        }
    }

    /// Create a LedgerConfig from CLI arguments
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let default = LedgerConfig::default();
        LedgerConfig::new(
            self.lock_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(default.lock_timeout),
            !self.allow_duplicate_currency,
            self.max_attempts.unwrap_or(default.retry.max_attempts),
        )
    }
}
