//! Concurrent batch processing of transfer requests
//!
//! This module provides the `BatchProcessor` struct, which runs every transfer
//! of a batch through a shared [`TransferEngine`] with bounded concurrency.
//!
//! # Design
//!
//! Transfers block on row locks, so each one runs on tokio's blocking pool
//! via `spawn_blocking`. At most `max_concurrent` transfers are in flight at
//! once; the order in which they commit is not the order of the batch.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     ├── Arc<TransferEngine>  (shared engine, clones share one ledger)
//!     └── max_concurrent       (in-flight bound)
//! ```

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::core::TransferEngine;
use crate::types::{LedgerError, TransferRequest, TransferResult};

/// Result of processing a single transfer request
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The request that was processed
    pub request: TransferRequest,

    /// The committed transfer, or why it failed
    pub result: Result<TransferResult, LedgerError>,
}

/// Runs batches of transfers concurrently
///
/// The processor is cloneable and can be shared across async tasks.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    engine: Arc<TransferEngine>,
    max_concurrent: usize,
}

impl BatchProcessor {
    /// Create a new BatchProcessor
    ///
    /// A `max_concurrent` of zero is treated as one.
    pub fn new(engine: Arc<TransferEngine>, max_concurrent: usize) -> Self {
        Self {
            engine,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn engine(&self) -> &TransferEngine {
        &self.engine
    }

    /// Process a single transfer on the blocking pool
    async fn process_one(&self, request: TransferRequest) -> ProcessingResult {
        let engine = Arc::clone(&self.engine);
        let outcome = tokio::task::spawn_blocking(move || {
            engine.transfer(request.from, request.to, request.amount)
        })
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(e) => Err(LedgerError::internal(format!("transfer task failed: {}", e))),
        };
        ProcessingResult { request, result }
    }

    /// Process a batch of transfer requests
    ///
    /// # Returns
    ///
    /// One `ProcessingResult` per request, in completion order.
    ///
    /// # Guarantees
    ///
    /// - Every request is processed, even if some fail
    /// - Errors are captured in results and don't stop processing
    /// - No more than `max_concurrent` transfers run at the same time
    pub async fn process_batch(&self, batch: Vec<TransferRequest>) -> Vec<ProcessingResult> {
        stream::iter(batch)
            .map(|request| self.process_one(request))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }
}
