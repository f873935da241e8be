//! Ledger Engine CLI
//!
//! Command-line interface for opening accounts and applying transfers from
//! CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy async accounts.csv transfers.csv > balances.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 accounts.csv transfers.csv
//! RUST_LOG=debug cargo run -- --max-attempts 3 --lock-timeout-ms 200 accounts.csv transfers.csv
//! ```
//!
//! The program opens every account of the first file, applies every transfer
//! of the second one, and writes the final account states to stdout.
//! Diagnostics go to stderr.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (missing arguments, file not found, file not readable, etc.)

use ledger_engine::cli;
use ledger_engine::logging;
use ledger_engine::strategy;
use std::process;

fn main() {
    logging::init_logging();

    let args = cli::parse_args();

    let strategy = {
        let config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy, config, args.to_ledger_config())
    };

    let mut output = std::io::stdout();
    if let Err(e) = strategy.process(&args.accounts_file, &args.transfers_file, &mut output) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
