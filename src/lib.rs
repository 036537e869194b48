//! # edgequake-worksheet
//!
//! Turn PDF teaching material into a lesson worksheet with an LLM.
//!
//! ## Why this crate?
//!
//! Writing a worksheet from a textbook chapter means re-reading the chapter,
//! picking the concepts worth testing, writing questions at several levels
//! and then writing the answer key. This crate extracts the text of the pages
//! you choose, asks a chat-completion model for a structured worksheet in
//! JSON, and renders it as a Word, PDF or HTML document with a student part
//! and a separate teacher part.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     read local file or download from URL; reject non-PDFs
//!  ├─ 2. Extract   per-page text + PNG previews via pdfium (spawn_blocking)
//!  ├─ 3. Select    include / exclude pages
//!  ├─ 4. Prompt    join included pages, cap at 15 000 chars
//!  ├─ 5. Complete  one JSON-mode chat completion call
//!  └─ 6. Render    DOCX / PDF / HTML
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_worksheet::{generate_worksheet, OutputFormat, WorksheetConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key from OPENAI_API_KEY
//!     let config = WorksheetConfig::builder()
//!         .output_format(OutputFormat::Html)
//!         .user_request("Grade 8, 45 minutes, focus on diagrams")
//!         .build()?;
//!     let output = generate_worksheet("chapter3.pdf", &config).await?;
//!     std::fs::write(&output.document.file_name, &output.document.bytes)?;
//!     eprintln!("tokens: {} in / {} out",
//!         output.stats.input_tokens,
//!         output.stats.output_tokens);
//!     Ok(())
//! }
//! ```
//!
//! For page selection and retries, drive a [`WorksheetSession`]:
//!
//! ```rust,no_run
//! use edgequake_worksheet::{PageSelection, PdfUpload, WorksheetConfig, WorksheetSession};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut session = WorksheetSession::new(WorksheetConfig::default());
//! let bytes = std::fs::read("chapter3.pdf")?;
//! session.load(PdfUpload::from_bytes("chapter3.pdf", bytes)).await?;
//! session.apply_selection(&"3-7".parse::<PageSelection>()?)?;
//! let output = match session.generate().await {
//!     Ok(output) => output,
//!     // The document is kept after a failure, so just try again.
//!     Err(_) => session.generate().await?,
//! };
//! # let _ = output;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2worksheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-worksheet = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Extraction needs the pdfium shared library. Set `PDFIUM_LIB_PATH` to the
//! library file or its directory, or install it on the system library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
pub mod session;
pub mod worksheet;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{OutputFormat, PageSelection, WorksheetConfig, WorksheetConfigBuilder};
pub use document::{DocumentMetadata, LoadedDocument, PagePreview, PageRecord};
pub use error::WorksheetError;
pub use generate::{
    generate_from_bytes, generate_sync, generate_to_file, generate_worksheet, inspect,
    write_output,
};
pub use output::{GenerationOutput, GenerationStats, RenderedDocument};
pub use pipeline::input::PdfUpload;
pub use pipeline::llm::{CompletionClient, CompletionRequest, CompletionResponse, OpenAiClient};
pub use progress::{NoopProgressCallback, ProgressCallback, WorksheetProgressCallback};
pub use session::{SessionState, WorksheetSession};
pub use worksheet::Worksheet;
