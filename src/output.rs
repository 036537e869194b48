//! Output types for worksheet generation.

use crate::config::OutputFormat;
use crate::worksheet::Worksheet;
use serde::{Deserialize, Serialize};

/// Complete result of one generation.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// The worksheet as returned by the model.
    pub worksheet: Worksheet,
    /// The rendered document, ready to write or send.
    pub document: RenderedDocument,
    pub stats: GenerationStats,
}

/// A rendered output file held in memory.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub format: OutputFormat,
    /// Suggested file name, `"{title}.{ext}"`.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for RenderedDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedDocument")
            .field("format", &self.format)
            .field("file_name", &self.file_name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Statistics about a generation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Pages in the document.
    pub total_pages: usize,
    /// Pages whose text went into the prompt.
    pub included_pages: usize,
    /// Characters of source text sent to the model.
    pub source_chars: usize,
    /// Whether the source text was cut at the character cap.
    pub truncated: bool,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Wall-clock time of the completion call.
    pub request_duration_ms: u64,
    /// Time spent rendering the document.
    pub render_duration_ms: u64,
}
