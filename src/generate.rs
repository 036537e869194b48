//! Generation entry points.
//!
//! The free functions here cover the one-shot case (path or URL in, worksheet
//! out). Interactive callers that want to change the page selection or retry
//! after a failure should drive a [`WorksheetSession`] directly; these
//! functions are thin wrappers around one.

use crate::config::WorksheetConfig;
use crate::document::LoadedDocument;
use crate::error::WorksheetError;
use crate::output::{GenerationOutput, GenerationStats, RenderedDocument};
use crate::pipeline::llm::{ChatMessage, CompletionClient, CompletionRequest, OpenAiClient};
use crate::pipeline::prompt::PromptMessages;
use crate::pipeline::{extract, input, preview};
use crate::render;
use crate::session::WorksheetSession;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Generate a worksheet from a PDF file or URL, using every page.
///
/// # Errors
/// Validation errors (not a PDF, missing API key, no text) are returned
/// before any request is made. Network, API and parse failures are returned
/// as-is; nothing is retried.
pub async fn generate_worksheet(
    input_str: impl AsRef<str>,
    config: &WorksheetConfig,
) -> Result<GenerationOutput, WorksheetError> {
    let input_str = input_str.as_ref();
    info!("Starting generation: {}", input_str);

    let upload = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let mut session = WorksheetSession::new(config.clone());
    session.load(upload).await?;
    session.generate().await
}

/// Generate a worksheet from PDF bytes held in memory.
pub async fn generate_from_bytes(
    name: impl Into<String>,
    bytes: Vec<u8>,
    config: &WorksheetConfig,
) -> Result<GenerationOutput, WorksheetError> {
    let upload = input::PdfUpload::from_bytes(name, bytes);
    let mut session = WorksheetSession::new(config.clone());
    session.load(upload).await?;
    session.generate().await
}

/// Generate a worksheet and write the document to disk.
///
/// `output` may be a file path, an existing directory (the document is
/// written there under its title-derived name), or `None` for the current
/// directory. Returns the output and the path written.
pub async fn generate_to_file(
    input_str: impl AsRef<str>,
    output: Option<&Path>,
    config: &WorksheetConfig,
) -> Result<(GenerationOutput, PathBuf), WorksheetError> {
    let result = generate_worksheet(input_str, config).await?;
    let path = output_path_for(output, &result.document.file_name);
    write_output(&result.document.bytes, &path).await?;
    Ok((result, path))
}

/// Synchronous wrapper around [`generate_worksheet`].
///
/// Creates a temporary tokio runtime internally.
pub fn generate_sync(
    input_str: impl AsRef<str>,
    config: &WorksheetConfig,
) -> Result<GenerationOutput, WorksheetError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| WorksheetError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(generate_worksheet(input_str, config))
}

/// Extract page text and metadata without previews or a model call.
///
/// Does not require an API key.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &WorksheetConfig,
) -> Result<LoadedDocument, WorksheetError> {
    let upload = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    upload.validate()?;
    let extracted = extract::extract_text(
        &upload,
        config.password.as_deref(),
        config.progress_callback.clone(),
    )
    .await?;
    Ok(LoadedDocument {
        name: upload.name.clone(),
        size: upload.size(),
        metadata: extracted.metadata,
        pages: extracted.pages,
        previews: Vec::new(),
    })
}

/// Where a document named `file_name` should be written.
pub fn output_path_for(output: Option<&Path>, file_name: &str) -> PathBuf {
    match output {
        Some(p) if p.is_dir() => p.join(file_name),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(file_name),
    }
}

/// Write bytes atomically: temp file in the target directory, then rename.
pub async fn write_output(bytes: &[u8], path: &Path) -> Result<(), WorksheetError> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();

    tokio::task::spawn_blocking(move || {
        let write_err = |e: std::io::Error| WorksheetError::OutputWriteFailed {
            path: path.clone(),
            source: e,
        };

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(write_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".worksheet-")
            .tempfile_in(&dir)
            .map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        debug!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    })
    .await
    .map_err(|e| WorksheetError::Internal(format!("Write task panicked: {}", e)))?
}

// ── Pipeline steps used by the session ───────────────────────────────────

/// Validate, then run text extraction and preview rendering concurrently.
pub(crate) async fn extract_document(
    upload: input::PdfUpload,
    config: &WorksheetConfig,
) -> Result<LoadedDocument, WorksheetError> {
    upload.validate()?;
    let start = Instant::now();
    let password = config.password.as_deref();

    let (extracted, previews) = tokio::try_join!(
        extract::extract_text(&upload, password, config.progress_callback.clone()),
        preview::render_previews(&upload, password, config.preview_max_pixels),
    )?;

    info!(
        "Extracted {} pages from {} in {}ms",
        extracted.pages.len(),
        upload.name,
        start.elapsed().as_millis()
    );

    Ok(LoadedDocument {
        name: upload.name.clone(),
        size: upload.size(),
        metadata: extracted.metadata,
        pages: extracted.pages,
        previews,
    })
}

/// The configured client, or an [`OpenAiClient`] built from the API key.
pub(crate) fn resolve_client(
    config: &WorksheetConfig,
) -> Result<Arc<dyn CompletionClient>, WorksheetError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }
    let key = config.resolve_api_key()?;
    let client = OpenAiClient::new(&config.api_base_url, key, config.api_timeout_secs)?;
    Ok(Arc::new(client))
}

/// Send the prompt and render the returned worksheet.
pub(crate) async fn run_generation(
    doc: &LoadedDocument,
    messages: PromptMessages,
    client: &dyn CompletionClient,
    config: &WorksheetConfig,
) -> Result<GenerationOutput, WorksheetError> {
    let request = CompletionRequest {
        model: config.model.clone(),
        messages: vec![
            ChatMessage::system(messages.system),
            ChatMessage::user(messages.user),
        ],
        temperature: config.temperature(),
        max_tokens: config.max_tokens,
    };

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_start(&config.model, messages.source_chars);
    }

    let request_start = Instant::now();
    let response = client.complete(&request).await?;
    let request_duration_ms = request_start.elapsed().as_millis() as u64;
    info!(
        "Completion received: {} input / {} output tokens in {}ms",
        response.input_tokens, response.output_tokens, request_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_request_complete(response.input_tokens, response.output_tokens);
    }

    let render_start = Instant::now();
    let document: RenderedDocument = render::render(&response.worksheet, config)?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;

    if let Some(ref cb) = config.progress_callback {
        cb.on_document_rendered(&document.file_name, document.bytes.len());
    }

    let stats = GenerationStats {
        total_pages: doc.page_count(),
        included_pages: doc.included_count(),
        source_chars: messages.source_chars,
        truncated: messages.truncated,
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        request_duration_ms,
        render_duration_ms,
    };

    Ok(GenerationOutput {
        worksheet: response.worksheet,
        document,
        stats,
    })
}
