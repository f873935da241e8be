//! Logging setup for the command-line binary
//!
//! Events go to stderr so stdout carries only the CSV output. The filter is
//! read from `RUST_LOG` and defaults to `warn`, which reports skipped rows
//! and failed transfers.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default filter when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "warn";

/// Build the filter from `RUST_LOG`, falling back to [`DEFAULT_FILTER`]
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// Calling it more than once is harmless; later calls leave the first
/// subscriber in place.
pub fn init_logging() {
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stderr_layer)
        .try_init();
}
