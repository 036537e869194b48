//! Error types for the edgequake-worksheet library.
//!
//! A single [`WorksheetError`] covers every failure, but callers often need
//! to know *when* it happened relative to the network call:
//!
//! * **Validation errors**: wrong file type, empty page selection, missing
//!   API key. These are detected before any extraction or network activity
//!   and should be shown to the user immediately so they can fix the input.
//!
//! * **Runtime errors**: the PDF could not be parsed, the completion API
//!   failed, a document could not be written. These happen mid-operation and
//!   leave the session in a retryable state.
//!
//! [`WorksheetError::is_validation`] exposes that split without forcing
//! callers to match on every variant.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the edgequake-worksheet library.
#[derive(Debug, Error)]
pub enum WorksheetError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The upload's MIME type is not `application/pdf`.
    #[error("Only PDF files can be uploaded: '{name}' is {mime_type}")]
    NotAPdf { name: String, mime_type: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{name}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { name: String, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{name}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { name: String },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{name}'")]
    WrongPassword { name: String },

    /// pdfium could not read the text layer of a page.
    #[error("Text extraction failed for page {page}: {detail}")]
    ExtractionFailed { page: usize, detail: String },

    /// pdfium could not rasterise a page preview.
    #[error("Preview rendering failed for page {page}: {detail}")]
    PreviewFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH to the directory containing libpdfium, or install\n\
pdfium system-wide. Prebuilt binaries: https://github.com/bblanchon/pdfium-binaries\n"
    )]
    PdfiumBindingFailed(String),

    // ── Session errors ────────────────────────────────────────────────────
    /// No page is included, or every included page is blank.
    #[error("No pages selected. Include at least one page with text.")]
    EmptySelection,

    /// A page number outside 1..=total was addressed.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// An action was attempted before a PDF was loaded.
    #[error("No PDF loaded. Load a PDF before {action}.")]
    NoDocumentLoaded { action: &'static str },

    /// An action is not valid in the session's current state.
    #[error("Cannot {action} while the session is {state}")]
    InvalidState {
        action: &'static str,
        state: &'static str,
    },

    // ── Completion API errors ─────────────────────────────────────────────
    /// No API key in config or environment.
    #[error("OpenAI API key is missing.\nPass --api-key or set OPENAI_API_KEY.")]
    MissingApiKey,

    /// The completion API answered with a non-success status.
    ///
    /// `message` is the provider's own error text when the body carried one.
    #[error("{message}")]
    ApiError { status: u16, message: String },

    /// The request never got an HTTP answer (DNS, TLS, timeout, ...).
    #[error("Completion request failed: {0}")]
    Http(String),

    /// The response (or its message content) is not the expected JSON.
    #[error("Malformed completion response: {0}")]
    MalformedResponse(String),

    // ── Output errors ─────────────────────────────────────────────────────
    /// A document back-end failed to assemble the output.
    #[error("Failed to render {format} document: {detail}")]
    RenderFailed { format: &'static str, detail: String },

    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WorksheetError {
    /// `true` for input problems detected before any extraction or network
    /// activity. Everything else is a runtime failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            WorksheetError::FileNotFound { .. }
                | WorksheetError::PermissionDenied { .. }
                | WorksheetError::InvalidInput { .. }
                | WorksheetError::NotAPdf { .. }
                | WorksheetError::EmptySelection
                | WorksheetError::PageOutOfRange { .. }
                | WorksheetError::NoDocumentLoaded { .. }
                | WorksheetError::InvalidState { .. }
                | WorksheetError::MissingApiKey
                | WorksheetError::InvalidConfig(_)
        )
    }
}
