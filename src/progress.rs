//! Progress-callback trait for pipeline events.
//!
//! Inject an [`Arc<dyn WorksheetProgressCallback>`] via
//! [`crate::config::WorksheetConfigBuilder::progress_callback`] to receive
//! events as a PDF is extracted, sent to the model and rendered.
//!
//! # Example
//!
//! ```rust
//! use edgequake_worksheet::{WorksheetConfig, WorksheetProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct PageCounter {
//!     pages: AtomicUsize,
//! }
//!
//! impl WorksheetProgressCallback for PageCounter {
//!     fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize) {
//!         self.pages.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {page_num}/{total_pages}: {chars} chars");
//!     }
//! }
//!
//! let counter = Arc::new(PageCounter { pages: AtomicUsize::new(0) });
//! let config = WorksheetConfig::builder()
//!     .progress_callback(counter as Arc<dyn WorksheetProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the pipeline at each stage boundary.
///
/// Implementations must be `Send + Sync`: extraction runs on a blocking
/// thread-pool thread while the caller awaits on a Tokio worker. All methods
/// have default no-op implementations so callers only override what they
/// care about.
pub trait WorksheetProgressCallback: Send + Sync {
    /// Called once the PDF is opened and its page count is known.
    fn on_extraction_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called after each page's text has been extracted.
    ///
    /// # Arguments
    /// * `page_num`: 1-indexed page number
    /// * `total_pages`: pages in the document
    /// * `chars`: characters of text found on the page
    fn on_page_extracted(&self, page_num: usize, total_pages: usize, chars: usize) {
        let _ = (page_num, total_pages, chars);
    }

    /// Called just before the completion request is sent.
    ///
    /// # Arguments
    /// * `model`: model identifier
    /// * `source_chars`: characters of source text in the prompt, after truncation
    fn on_request_start(&self, model: &str, source_chars: usize) {
        let _ = (model, source_chars);
    }

    /// Called when the completion response has been parsed.
    fn on_request_complete(&self, input_tokens: u64, output_tokens: u64) {
        let _ = (input_tokens, output_tokens);
    }

    /// Called after the output document has been assembled.
    ///
    /// # Arguments
    /// * `file_name`: suggested download name, e.g. `"Photosynthesis.docx"`
    /// * `bytes`: size of the rendered document
    fn on_document_rendered(&self, file_name: &str, bytes: usize) {
        let _ = (file_name, bytes);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl WorksheetProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::WorksheetConfig`].
pub type ProgressCallback = Arc<dyn WorksheetProgressCallback>;
