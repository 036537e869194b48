//! Pipeline stages for PDF-to-worksheet generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ─┐
//! (path/URL)          ├─▶ prompt ──▶ llm ──▶ (render)
//!           preview ──┘   (select)   (API)
//! ```
//!
//! 1. [`input`]: read a path or URL into memory and check it is a PDF
//! 2. [`extract`]: per-page text and metadata via pdfium, in `spawn_blocking`
//! 3. [`preview`]: per-page PNG previews, run concurrently with extraction
//! 4. [`prompt`]: join the included pages and build the two messages
//! 5. [`llm`]: the single completion call; the only stage that talks to
//!    the model
//! 6. [`postprocess`]: text cleanup on the way in (page text) and out
//!    (JSON content)

pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod preview;
pub mod prompt;
