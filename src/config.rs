//! Configuration types for worksheet generation.
//!
//! All generation behaviour is controlled through [`WorksheetConfig`], built
//! via its [`WorksheetConfigBuilder`]. The same struct drives the library
//! entry points, the [`crate::session::WorksheetSession`] controller and the
//! CLI, so a run can be reproduced by logging a single value.

use crate::error::WorksheetError;
use crate::pipeline::llm::CompletionClient;
use crate::progress::ProgressCallback;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Default chat-completion endpoint base.
pub const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Maximum number of source characters sent to the model.
///
/// Keeps the request well inside the provider's input limits.
pub const DEFAULT_SOURCE_CHAR_LIMIT: usize = 15_000;

/// Configuration for one worksheet generation.
///
/// Built via [`WorksheetConfig::builder()`] or using
/// [`WorksheetConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_worksheet::{OutputFormat, WorksheetConfig};
///
/// let config = WorksheetConfig::builder()
///     .model("gpt-4o")
///     .temperature(0.3)
///     .output_format(OutputFormat::Html)
///     .user_request("Focus on chapter 2 vocabulary")
///     .build()
///     .unwrap();
/// assert_eq!(config.temperature(), 0.3);
/// ```
#[derive(Clone)]
pub struct WorksheetConfig {
    /// Bearer token for the completion API. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API. `/chat/completions` is appended.
    pub api_base_url: String,

    /// Model identifier, e.g. "gpt-4o-mini", "gpt-4o".
    pub model: String,

    /// Sampling temperature in tenths: 0 → 0.0, 10 → 1.0. Default: 7.
    pub temperature_tenths: u8,

    /// Maximum tokens the model may generate. Default: 4000.
    ///
    /// A full worksheet with teacher guide runs 2 500–3 500 tokens; lower
    /// values truncate the JSON mid-object and the parse fails.
    pub max_tokens: u32,

    /// Hard cap on source characters embedded in the prompt. Default: 15 000.
    pub source_char_limit: usize,

    /// Editable persona/task template. The JSON schema instruction is always
    /// appended after it.
    pub system_prompt: String,

    /// Free-text customisation appended to the user message.
    pub user_request: Option<String>,

    /// Document format produced from the worksheet JSON.
    pub output_format: OutputFormat,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// TrueType font embedded in PDF output. Built-in Helvetica when `None`,
    /// which only covers Latin-1 text.
    pub pdf_font_path: Option<PathBuf>,

    /// Longest edge of a rendered page preview, in pixels. Default: 1000.
    pub preview_max_pixels: u32,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Completion request timeout in seconds. Default: 180.
    pub api_timeout_secs: u64,

    /// Pre-constructed completion client. Takes precedence over the
    /// HTTP client built from `api_key` / `api_base_url`.
    pub client: Option<Arc<dyn CompletionClient>>,

    /// Receives pipeline events (extraction, request, render).
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for WorksheetConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature_tenths: 7,
            max_tokens: 4000,
            source_char_limit: DEFAULT_SOURCE_CHAR_LIMIT,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_request: None,
            output_format: OutputFormat::default(),
            password: None,
            pdf_font_path: None,
            preview_max_pixels: 1000,
            download_timeout_secs: 120,
            api_timeout_secs: 180,
            client: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for WorksheetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorksheetConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base_url", &self.api_base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature())
            .field("max_tokens", &self.max_tokens)
            .field("source_char_limit", &self.source_char_limit)
            .field("user_request", &self.user_request)
            .field("output_format", &self.output_format)
            .field("pdf_font_path", &self.pdf_font_path)
            .field("client", &self.client.as_ref().map(|_| "<dyn CompletionClient>"))
            .finish()
    }
}

impl WorksheetConfig {
    /// Create a new builder for `WorksheetConfig`.
    pub fn builder() -> WorksheetConfigBuilder {
        WorksheetConfigBuilder {
            config: Self::default(),
        }
    }

    /// Sampling temperature as sent to the API (0.0–1.0 in steps of 0.1).
    pub fn temperature(&self) -> f32 {
        f32::from(self.temperature_tenths) / 10.0
    }

    /// The API key from config, else from `OPENAI_API_KEY`. Blank keys count
    /// as missing.
    pub fn resolve_api_key(&self) -> Result<String, WorksheetError> {
        let key = match self.api_key.as_deref() {
            Some(k) => k.trim().to_string(),
            None => std::env::var("OPENAI_API_KEY")
                .map(|k| k.trim().to_string())
                .unwrap_or_default(),
        };
        if key.is_empty() {
            Err(WorksheetError::MissingApiKey)
        } else {
            Ok(key)
        }
    }
}

/// Builder for [`WorksheetConfig`].
pub struct WorksheetConfigBuilder {
    config: WorksheetConfig,
}

impl fmt::Debug for WorksheetConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorksheetConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl WorksheetConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the temperature, rounded to the nearest tenth and clamped to 0.0–1.0.
    pub fn temperature(mut self, t: f32) -> Self {
        let tenths = (t * 10.0).round().clamp(0.0, 10.0);
        self.config.temperature_tenths = tenths as u8;
        self
    }

    pub fn temperature_tenths(mut self, tenths: u8) -> Self {
        self.config.temperature_tenths = tenths.min(10);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn source_char_limit(mut self, n: usize) -> Self {
        self.config.source_char_limit = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Blank requests are treated as no request.
    pub fn user_request(mut self, request: impl Into<String>) -> Self {
        let request = request.into();
        self.config.user_request = if request.trim().is_empty() {
            None
        } else {
            Some(request)
        };
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pdf_font_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdf_font_path = Some(path.into());
        self
    }

    pub fn preview_max_pixels(mut self, px: u32) -> Self {
        self.config.preview_max_pixels = px.max(100);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn client(mut self, client: Arc<dyn CompletionClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WorksheetConfig, WorksheetError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(WorksheetError::InvalidConfig("model must not be empty".into()));
        }
        if c.max_tokens == 0 {
            return Err(WorksheetError::InvalidConfig("max_tokens must be ≥ 1".into()));
        }
        if c.source_char_limit == 0 {
            return Err(WorksheetError::InvalidConfig(
                "source_char_limit must be ≥ 1".into(),
            ));
        }
        if !(c.api_base_url.starts_with("http://") || c.api_base_url.starts_with("https://")) {
            return Err(WorksheetError::InvalidConfig(format!(
                "api_base_url must be an HTTP(S) URL, got '{}'",
                c.api_base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Target document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Word-processor document (default).
    #[default]
    Docx,
    /// PDF drawn with printpdf.
    Pdf,
    /// Self-contained styled HTML page.
    Html,
}

impl OutputFormat {
    /// File extension without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Pdf => "pdf",
            OutputFormat::Html => "html",
        }
    }

    /// MIME type of the produced file.
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            OutputFormat::Pdf => "application/pdf",
            OutputFormat::Html => "text/html",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = WorksheetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "docx" | "word" => Ok(OutputFormat::Docx),
            "pdf" => Ok(OutputFormat::Pdf),
            "html" | "htm" => Ok(OutputFormat::Html),
            other => Err(WorksheetError::InvalidConfig(format!(
                "unknown output format '{other}' (expected docx, pdf or html)"
            ))),
        }
    }
}

/// Specifies which pages of the PDF to include in the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Include all pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 1-indexed
    /// page numbers that exist in a document of `total_pages` pages.
    pub fn to_page_numbers(&self, total_pages: usize) -> Vec<usize> {
        let in_range = |p: &usize| *p >= 1 && *p <= total_pages;
        let mut pages: Vec<usize> = match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::Single(p) => std::iter::once(*p).filter(in_range).collect(),
            PageSelection::Range(start, end) => ((*start).max(1)..=(*end).min(total_pages)).collect(),
            PageSelection::Set(pages) => pages.iter().copied().filter(in_range).collect(),
        };
        pages.sort_unstable();
        pages.dedup();
        pages
    }

    /// `true` if page `page_num` (1-indexed) is part of the selection.
    pub fn contains(&self, page_num: usize) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Single(p) => *p == page_num,
            PageSelection::Range(start, end) => (*start..=*end).contains(&page_num),
            PageSelection::Set(pages) => pages.contains(&page_num),
        }
    }
}

impl FromStr for PageSelection {
    type Err = WorksheetError;

    /// Parse `all`, `5`, `3-15` or `1,3,5,7`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        let parse_page = |p: &str| -> Result<usize, WorksheetError> {
            let page: usize = p.trim().parse().map_err(|_| {
                WorksheetError::InvalidConfig(format!("invalid page number: '{}'", p.trim()))
            })?;
            if page < 1 {
                return Err(WorksheetError::InvalidConfig(format!(
                    "pages are 1-indexed, minimum is 1 (got {page})"
                )));
            }
            Ok(page)
        };

        if s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            let (start, end) = (parse_page(start)?, parse_page(end)?);
            if start > end {
                return Err(WorksheetError::InvalidConfig(format!(
                    "invalid page range '{start}-{end}': start must be <= end"
                )));
            }
            return Ok(PageSelection::Range(start, end));
        }

        if s.contains(',') {
            let pages = s
                .split(',')
                .filter(|p| !p.trim().is_empty())
                .map(parse_page)
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PageSelection::Set(pages));
        }

        parse_page(&s).map(PageSelection::Single)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = WorksheetConfig::default();
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.temperature(), 0.7);
        assert_eq!(c.max_tokens, 4000);
        assert_eq!(c.source_char_limit, 15_000);
        assert_eq!(c.output_format, OutputFormat::Docx);
        assert!(c.user_request.is_none());
    }

    #[test]
    fn temperature_is_rounded_to_tenths_and_clamped() {
        let c = WorksheetConfig::builder().temperature(0.34).build().unwrap();
        assert_eq!(c.temperature_tenths, 3);
        let c = WorksheetConfig::builder().temperature(1.7).build().unwrap();
        assert_eq!(c.temperature(), 1.0);
        let c = WorksheetConfig::builder().temperature(-0.2).build().unwrap();
        assert_eq!(c.temperature(), 0.0);
        let c = WorksheetConfig::builder().temperature_tenths(42).build().unwrap();
        assert_eq!(c.temperature_tenths, 10);
    }

    #[test]
    fn blank_user_request_is_dropped() {
        let c = WorksheetConfig::builder().user_request("   ").build().unwrap();
        assert!(c.user_request.is_none());
    }

    #[test]
    fn build_rejects_bad_values() {
        assert!(WorksheetConfig::builder().model(" ").build().is_err());
        assert!(WorksheetConfig::builder().max_tokens(0).build().is_err());
        assert!(WorksheetConfig::builder().source_char_limit(0).build().is_err());
        assert!(WorksheetConfig::builder()
            .api_base_url("ftp://example.com")
            .build()
            .is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let c = WorksheetConfig::builder()
            .api_base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(c.api_base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn explicit_blank_api_key_is_missing() {
        let c = WorksheetConfig::builder().api_key("  ").build().unwrap();
        assert!(matches!(c.resolve_api_key(), Err(WorksheetError::MissingApiKey)));
        let c = WorksheetConfig::builder().api_key(" sk-test ").build().unwrap();
        assert_eq!(c.resolve_api_key().unwrap(), "sk-test");
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = WorksheetConfig::builder().api_key("sk-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn output_format_parse() {
        assert_eq!("DOCX".parse::<OutputFormat>().unwrap(), OutputFormat::Docx);
        assert_eq!("pdf".parse::<OutputFormat>().unwrap(), OutputFormat::Pdf);
        assert_eq!("htm".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
        assert!("odt".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Html.extension(), "html");
    }

    #[test]
    fn page_selection_parse() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("5".parse::<PageSelection>().unwrap(), PageSelection::Single(5));
        assert_eq!(
            "3-15".parse::<PageSelection>().unwrap(),
            PageSelection::Range(3, 15)
        );
        assert_eq!(
            "1, 3,5".parse::<PageSelection>().unwrap(),
            PageSelection::Set(vec![1, 3, 5])
        );
        assert!("0".parse::<PageSelection>().is_err());
        assert!("5-3".parse::<PageSelection>().is_err());
        assert!("abc".parse::<PageSelection>().is_err());
    }

    #[test]
    fn page_selection_to_page_numbers() {
        assert_eq!(PageSelection::All.to_page_numbers(3), vec![1, 2, 3]);
        assert_eq!(PageSelection::Single(6).to_page_numbers(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(3, 10).to_page_numbers(4), vec![3, 4]);
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3, 9]).to_page_numbers(5),
            vec![1, 3]
        );
        assert!(PageSelection::Range(2, 4).contains(3));
        assert!(!PageSelection::Set(vec![1, 2]).contains(3));
    }
}
