//! Progress-callback trait for per-document conversion events.
//!
//! Attach an [`Arc<dyn ConversionProgressCallback>`] with
//! [`crate::convert::ConversionPipeline::with_progress`] to receive events as
//! a pipeline run converts each entry.
//!
//! Events for entries are always delivered in upload order, even when the
//! pipeline runs several OCR calls at once: a later entry's completion is
//! held back until every earlier one has been reported.
//!
//! # Example
//!
//! ```rust
//! use pdf2llm::{ConversionProgressCallback, DocumentId};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_entry_complete(&self, _id: DocumentId, name: &str, markdown_len: usize) {
//!         let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("{done}: {name} ({markdown_len} bytes)");
//!     }
//! }
//! ```

use crate::document::DocumentId;
use std::sync::Arc;

/// Called by the pipeline as it converts each entry.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once per run, before any entry is attempted.
    ///
    /// `to_convert` counts entries this run will attempt (pending and
    /// previously failed ones).
    fn on_conversion_start(&self, to_convert: usize) {
        let _ = to_convert;
    }

    /// Called when an entry is handed to the OCR service.
    fn on_entry_start(&self, id: DocumentId, name: &str) {
        let _ = (id, name);
    }

    /// Called when an entry converted successfully.
    ///
    /// `markdown_len` is the byte length of the joined page markdown; `0`
    /// when the service found no pages.
    fn on_entry_complete(&self, id: DocumentId, name: &str, markdown_len: usize) {
        let _ = (id, name, markdown_len);
    }

    /// Called when an entry failed. `error` is the underlying cause.
    fn on_entry_error(&self, id: DocumentId, name: &str, error: &str) {
        let _ = (id, name, error);
    }

    /// Called once after every entry of the run has been attempted.
    fn on_conversion_complete(&self, attempted: usize, success_count: usize) {
        let _ = (attempted, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the type the pipeline stores.
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
