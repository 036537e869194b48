//! Document synthesis: worksheet → DOCX, PDF or HTML bytes.
//!
//! ## Data Flow
//!
//! ```text
//! Worksheet ──▶ layout ──▶ Vec<Block> ──┬──▶ docx  (docx-rs)
//!                                       ├──▶ pdf   (printpdf)
//!                                       └──▶ html  (string building)
//! ```
//!
//! [`layout`] decides *what* appears and in which order; the back-ends only
//! decide how a [`layout::Block`] looks in their format.

pub mod docx;
pub mod html;
pub mod layout;
pub mod pdf;

use crate::config::{OutputFormat, WorksheetConfig};
use crate::error::WorksheetError;
use crate::output::RenderedDocument;
use crate::worksheet::Worksheet;
use tracing::debug;

/// Render `worksheet` in the configured output format.
pub fn render(
    worksheet: &Worksheet,
    config: &WorksheetConfig,
) -> Result<RenderedDocument, WorksheetError> {
    let title = worksheet.display_title();
    let blocks = layout::layout(worksheet);
    let format = config.output_format;

    let bytes = match format {
        OutputFormat::Docx => docx::render_docx(&blocks)?,
        OutputFormat::Pdf => pdf::render_pdf(title, &blocks, config.pdf_font_path.as_deref())?,
        OutputFormat::Html => html::render_html(title, &blocks).into_bytes(),
    };
    debug!("Rendered {} blocks as {} ({} bytes)", blocks.len(), format, bytes.len());

    Ok(RenderedDocument {
        format,
        file_name: file_name_for(title, format),
        bytes,
    })
}

/// `"{title}.{ext}"` with characters that are unsafe in paths replaced.
pub fn file_name_for(title: &str, format: OutputFormat) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_matches(|c: char| c == '.' || c.is_whitespace());
    let stem = if stem.is_empty() {
        crate::worksheet::DEFAULT_TITLE
    } else {
        stem
    };
    format!("{}.{}", stem, format.extension())
}
