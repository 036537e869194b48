//! Text extraction: read every page's text layer via pdfium.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! `tokio::task::spawn_blocking` moves the work onto a dedicated thread pool
//! thread designed for blocking operations, preventing the Tokio worker
//! threads from stalling on a large document.
//!
//! ## Binding pdfium
//!
//! [`bind_pdfium`] looks for the shared library in `PDFIUM_LIB_PATH` (a file
//! or a directory), then next to the executable's working directory, then in
//! the system library path.

use crate::document::{DocumentMetadata, PageRecord};
use crate::error::WorksheetError;
use crate::pipeline::input::PdfUpload;
use crate::pipeline::postprocess::normalise_page_text;
use crate::progress::ProgressCallback;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Pages and metadata read from one PDF.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    pub metadata: DocumentMetadata,
    /// One record per page, ordered 1..=N, all included.
    pub pages: Vec<PageRecord>,
}

/// Bind to a pdfium shared library.
pub fn bind_pdfium() -> Result<Pdfium, WorksheetError> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(path) if !path.trim().is_empty() => {
            let path = Path::new(path.trim());
            if path.is_file() {
                Pdfium::bind_to_library(path)
            } else {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(path))
            }
        }
        _ => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library()),
    }
    .map_err(|e| WorksheetError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

/// Open a PDF from memory, mapping pdfium's load errors to ours.
pub(crate) fn load_document<'a>(
    pdfium: &'a Pdfium,
    bytes: &'a [u8],
    name: &str,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, WorksheetError> {
    pdfium.load_pdf_from_byte_slice(bytes, password).map_err(|e| {
        let err_str = format!("{:?}", e);
        if err_str.contains("Password") || err_str.contains("password") {
            if password.is_some() {
                WorksheetError::WrongPassword {
                    name: name.to_string(),
                }
            } else {
                WorksheetError::PasswordRequired {
                    name: name.to_string(),
                }
            }
        } else {
            WorksheetError::CorruptPdf {
                name: name.to_string(),
                detail: err_str,
            }
        }
    })
}

/// Extract the text of every page, in page order.
///
/// This runs inside `spawn_blocking` since pdfium operations are blocking.
pub async fn extract_text(
    upload: &PdfUpload,
    password: Option<&str>,
    progress: Option<ProgressCallback>,
) -> Result<ExtractedText, WorksheetError> {
    let bytes = upload.bytes.clone();
    let name = upload.name.clone();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || {
        extract_text_blocking(&bytes, &name, password.as_deref(), progress.as_ref())
    })
    .await
    .map_err(|e| WorksheetError::Internal(format!("Extraction task panicked: {}", e)))?
}

/// Blocking implementation of text extraction.
fn extract_text_blocking(
    bytes: &[u8],
    name: &str,
    password: Option<&str>,
    progress: Option<&ProgressCallback>,
) -> Result<ExtractedText, WorksheetError> {
    let pdfium = bind_pdfium()?;
    let document = load_document(&pdfium, bytes, name, password)?;
    let metadata = read_metadata(&document);
    let total_pages = metadata.page_count;
    info!("PDF loaded: {} ({} pages)", name, total_pages);

    if let Some(cb) = progress {
        cb.on_extraction_start(total_pages);
    }

    let mut pages = Vec::with_capacity(total_pages);
    for (idx, page) in document.pages().iter().enumerate() {
        let page_num = idx + 1;
        let raw = page
            .text()
            .map_err(|e| WorksheetError::ExtractionFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?
            .all();
        let text = normalise_page_text(&raw);
        debug!("Extracted page {} → {} chars", page_num, text.chars().count());

        if let Some(cb) = progress {
            cb.on_page_extracted(page_num, total_pages, text.chars().count());
        }
        pages.push(PageRecord::new(page_num, text));
    }

    Ok(ExtractedText { metadata, pages })
}

/// Read metadata from an open document.
fn read_metadata(document: &PdfDocument<'_>) -> DocumentMetadata {
    let metadata = document.metadata();

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    DocumentMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        page_count: document.pages().len() as usize,
        pdf_version: format!("{:?}", document.version()),
    }
}
