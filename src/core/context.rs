//! Caller-supplied deadline and cancellation for a transactional scope

use crate::types::LedgerError;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Deadline and cancellation signal observed by every store call and lock wait
///
/// The default context never expires. Cloning is cheap; clones of the same
/// cancellation token observe the same signal.
#[derive(Debug, Clone, Default)]
pub struct TxContext {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl TxContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Abort the scope once `deadline` has passed
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort the scope once `timeout` has elapsed from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Abort the scope when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the scope was cancelled or its deadline has passed
    ///
    /// Cancellation is checked first.
    pub fn check(&self, operation: &str) -> Result<(), LedgerError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(LedgerError::cancelled(operation));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(LedgerError::deadline_exceeded(operation));
        }
        Ok(())
    }

    /// Time left before the deadline, if there is one
    pub(crate) fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Whether a cancellation token is attached (lock waits must poll it)
    pub(crate) fn is_cancellable(&self) -> bool {
        self.cancel.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_context_never_expires() {
        let ctx = TxContext::new();
        assert!(ctx.check("op").is_ok());
        assert_eq!(ctx.remaining(), None);
        assert!(!ctx.is_cancellable());
    }

    #[test]
    fn test_past_deadline_is_exceeded() {
        let ctx = TxContext::new().with_deadline(Instant::now());
        assert_eq!(ctx.check("commit"), Err(LedgerError::deadline_exceeded("commit")));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_cancellation_takes_precedence() {
        let token = CancellationToken::new();
        let ctx = TxContext::new()
            .with_deadline(Instant::now())
            .with_cancellation(token.clone());
        token.cancel();
        assert_eq!(ctx.check("lock wait"), Err(LedgerError::cancelled("lock wait")));
    }

    #[test]
    fn test_future_deadline_is_not_exceeded() {
        let ctx = TxContext::new().with_timeout(Duration::from_secs(60));
        assert!(ctx.check("op").is_ok());
        assert!(ctx.remaining().is_some_and(|left| left > Duration::from_secs(30)));
    }
}
