//! Progress-callback trait for per-item batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::BatchConfigBuilder::progress_callback`] to receive
//! events as the batch runner processes each file, e.g. to drive a progress
//! bar in a GUI thread.
//!
//! # Example
//!
//! ```rust
//! use file_converter::{BatchConfig, BatchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, index: usize, total: usize, _output: &std::path::Path) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}/{total} done (item {index})");
//!     }
//! }
//!
//! let config = BatchConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the batch runner as it processes each input.
///
/// With `concurrency > 1` the per-item methods are called concurrently from
/// worker threads and in completion order, not input order. Implementations
/// must synchronise their own state. All methods default to no-ops.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any item is processed.
    fn on_batch_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before item `index` (0-based) is converted.
    fn on_item_start(&self, index: usize, total: usize, input: &Path) {
        let _ = (index, total, input);
    }

    /// Called when item `index` produced `output`.
    fn on_item_complete(&self, index: usize, total: usize, output: &Path) {
        let _ = (index, total, output);
    }

    /// Called when item `index` failed.
    fn on_item_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every item has been attempted.
    fn on_batch_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
#[derive(Debug, Default)]
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::BatchConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
