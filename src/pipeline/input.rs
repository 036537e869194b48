//! File intake: turn a user-supplied path or URL into a validated upload.
//!
//! ## Why MIME types?
//!
//! The upload is the only gate in front of pdfium. Rejecting anything that
//! is not `application/pdf` here means a stray `.docx` or screenshot produces
//! a clear message instead of a pdfium parse error, and it happens before any
//! extraction or network work. Downloads carry a `Content-Type` header; local
//! files are sniffed from their leading bytes, with the extension as a
//! fallback for formats we cannot recognise by content.

use crate::error::WorksheetError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// MIME type accepted by the pipeline.
pub const PDF_MIME_TYPE: &str = "application/pdf";

/// A file supplied by the user, held in memory.
#[derive(Clone)]
pub struct PdfUpload {
    /// File name shown to the user (no directory part).
    pub name: String,
    /// Declared or sniffed MIME type.
    pub mime_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PdfUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfUpload")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl PdfUpload {
    /// Wrap bytes, sniffing the MIME type from content and name.
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = sniff_mime_type(&name, &bytes).to_string();
        Self {
            name,
            mime_type,
            bytes,
        }
    }

    /// Wrap bytes with a MIME type declared by the source (e.g. an HTTP header).
    pub fn with_mime_type(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Human-readable size, e.g. `"(1.25 MB)"`.
    pub fn size_label(&self) -> String {
        format!("({:.2} MB)", self.bytes.len() as f64 / 1024.0 / 1024.0)
    }

    /// Reject anything that is not a PDF.
    pub fn validate(&self) -> Result<(), WorksheetError> {
        if self.mime_type == PDF_MIME_TYPE {
            Ok(())
        } else {
            Err(WorksheetError::NotAPdf {
                name: self.name.clone(),
                mime_type: self.mime_type.clone(),
            })
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to an in-memory upload.
///
/// The upload is *not* validated here; callers decide when to call
/// [`PdfUpload::validate`] so the rejection happens in one place.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<PdfUpload, WorksheetError> {
    if input.trim().is_empty() {
        return Err(WorksheetError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        read_local(Path::new(input)).await
    }
}

/// Read a local file, mapping I/O failures to input errors.
async fn read_local(path: &Path) -> Result<PdfUpload, WorksheetError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::PermissionDenied => WorksheetError::PermissionDenied {
            path: path.to_path_buf(),
        },
        std::io::ErrorKind::IsADirectory => WorksheetError::InvalidInput {
            input: path.display().to_string(),
        },
        _ => WorksheetError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let upload = PdfUpload::from_bytes(name, bytes);
    debug!(
        "Read local file {} ({} bytes, {})",
        path.display(),
        upload.size(),
        upload.mime_type
    );
    Ok(upload)
}

/// Download a URL into memory, taking the MIME type from `Content-Type`.
async fn download_url(url: &str, timeout_secs: u64) -> Result<PdfUpload, WorksheetError> {
    info!("Downloading PDF from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| WorksheetError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            WorksheetError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            WorksheetError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(WorksheetError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let declared = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(essence);
    let name = filename_from_url(url);

    let bytes = response
        .bytes()
        .await
        .map_err(|e| WorksheetError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?
        .to_vec();

    info!("Downloaded {} bytes from {}", bytes.len(), url);

    // Servers often label everything octet-stream; only trust a specific type.
    let upload = match declared {
        Some(mime) if mime != "application/octet-stream" => {
            PdfUpload::with_mime_type(name, mime, bytes)
        }
        _ => PdfUpload::from_bytes(name, bytes),
    };
    Ok(upload)
}

/// `"application/pdf; charset=binary"` → `"application/pdf"`.
fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// Extract a reasonable file name from the URL path.
fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded.pdf".to_string()
}

/// Guess a MIME type from leading bytes, then from the file extension.
///
/// A `.pdf` name without a `%PDF-` header is *not* reported as a PDF.
pub fn sniff_mime_type(name: &str, bytes: &[u8]) -> &'static str {
    // The header may be preceded by junk, but must sit in the first 1 KiB.
    let head = &bytes[..bytes.len().min(1024)];
    if head.windows(5).any(|w| w == b"%PDF-") {
        return PDF_MIME_TYPE;
    }
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return "image/jpeg";
    }
    if bytes.starts_with(b"GIF8") {
        return "image/gif";
    }

    let ext = PathBuf::from(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "txt" | "md" => "text/plain",
        "html" | "htm" => "text/html",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
