//! Ledger configuration
//!
//! Tunables for the in-memory persistence layer and the transfer engine.
//! Invalid values fall back to their defaults with a warning, the same way
//! the batch configuration does.

use std::time::Duration;

/// Retry policy applied by the transfer engine
///
/// Only errors classified as `Conflict` are retried; the executor itself
/// never retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. `1` disables retries.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 1 }
    }
}

/// Configuration for a [`Ledger`](crate::core::Ledger)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// How long a scope waits for a row lock before failing with `LockTimeout`
    pub lock_timeout: Duration,

    /// Enforce the `(owner, currency)` unique constraint on accounts
    pub unique_owner_currency: bool,

    /// Retry policy for transfers
    pub retry: RetryPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            unique_owner_currency: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Create a new LedgerConfig with custom values
    ///
    /// Zero values for `lock_timeout` or `max_attempts` are replaced by the defaults.
    pub fn new(lock_timeout: Duration, unique_owner_currency: bool, max_attempts: u32) -> Self {
        let default = Self::default();

        let lock_timeout = if lock_timeout.is_zero() {
            tracing::warn!(
                default = ?default.lock_timeout,
                "invalid lock_timeout (0), using default"
            );
            default.lock_timeout
        } else {
            lock_timeout
        };

        let max_attempts = if max_attempts == 0 {
            tracing::warn!(
                default = default.retry.max_attempts,
                "invalid max_attempts (0), using default"
            );
            default.retry.max_attempts
        } else {
            max_attempts
        };

        Self {
            lock_timeout,
            unique_owner_currency,
            retry: RetryPolicy { max_attempts },
        }
    }
}
