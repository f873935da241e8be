//! Asynchronous drivers for the transfer engine
//!
//! The engine itself is synchronous: a transfer blocks its thread while it
//! waits on row locks. This module adapts it to tokio by running transfers on
//! the blocking pool with bounded concurrency.

pub mod batch_processor;

pub use batch_processor::{BatchProcessor, ProcessingResult};
