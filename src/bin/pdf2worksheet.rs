//! CLI binary for edgequake-worksheet.
//!
//! A thin shim over the library crate: maps CLI flags to `WorksheetConfig`,
//! drives a `WorksheetSession` and writes the result.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_worksheet::generate::output_path_for;
use edgequake_worksheet::pipeline::input::resolve_input;
use edgequake_worksheet::pipeline::preview::contact_sheet_html;
use edgequake_worksheet::prompts::{system_message, DEFAULT_SYSTEM_PROMPT};
use edgequake_worksheet::{
    inspect, write_output, LoadedDocument, OutputFormat, PageSelection, ProgressCallback,
    WorksheetConfig, WorksheetProgressCallback, WorksheetSession,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Page bar during extraction, spinner while waiting for the model.
struct CliProgressCallback {
    bar: ProgressBar,
    request_started: std::sync::Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            request_started: std::sync::Mutex::new(None),
        })
    }

    /// Stop the spinner and wipe it so an error message lands on a clean line.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}

impl WorksheetProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Extracting");
    }

    fn on_page_extracted(&self, _page_num: usize, _total_pages: usize, _chars: usize) {
        self.bar.inc(1);
    }

    fn on_request_start(&self, model: &str, source_chars: usize) {
        self.bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        self.bar.reset_elapsed();
        self.bar.set_prefix("Generating");
        self.bar
            .set_message(format!("{model} is writing the worksheet ({source_chars} chars of source)…"));
        if let Ok(mut started) = self.request_started.lock() {
            *started = Some(Instant::now());
        }
    }

    fn on_request_complete(&self, input_tokens: u64, output_tokens: u64) {
        let secs = self
            .request_started
            .lock()
            .ok()
            .and_then(|s| *s)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        self.bar.println(format!(
            "  {} Response received  {}  {}",
            green("✓"),
            dim(&format!("{input_tokens} in / {output_tokens} out tokens")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.set_prefix("Rendering");
    }

    fn on_document_rendered(&self, file_name: &str, bytes: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} {}",
            green("✔"),
            bold(file_name),
            dim(&format!("({bytes} bytes)"))
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Word worksheet from every page
  pdf2worksheet chapter3.pdf

  # Pages 3-7 as HTML, written into out/
  pdf2worksheet chapter3.pdf --pages 3-7 --format html -o out/

  # Skip the glossary pages and add a request
  pdf2worksheet chapter3.pdf --exclude 18,19 --prompt "Grade 8, 45 minutes"

  # PDF output with a font that covers Korean
  pdf2worksheet unit.pdf --format pdf --pdf-font /usr/share/fonts/NanumGothic.ttf

  # See what text each page has (no API key needed)
  pdf2worksheet --inspect-only chapter3.pdf

  # Save page previews and a contact sheet before generating
  pdf2worksheet chapter3.pdf --preview-dir previews/

  # Any OpenAI-compatible endpoint
  pdf2worksheet chapter3.pdf --api-base http://localhost:11434/v1 --model llama3.1

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          API key
  WORKSHEET_MODEL         Model ID (default gpt-4o-mini)
  WORKSHEET_API_BASE      API base URL (default https://api.openai.com/v1)
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Log filter, e.g. edgequake_worksheet=debug
"#;

/// Generate lesson worksheets from PDF teaching material with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2worksheet",
    version,
    about = "Generate lesson worksheets (DOCX, PDF, HTML) from PDF material with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(required_unless_present = "print_system_prompt")]
    input: Option<String>,

    /// Output file, or an existing directory to write `<title>.<ext>` into.
    #[arg(short, long, env = "WORKSHEET_OUTPUT")]
    output: Option<PathBuf>,

    /// Output format: docx, pdf or html.
    #[arg(short, long, env = "WORKSHEET_FORMAT", default_value = "docx")]
    format: OutputFormat,

    /// Model ID.
    #[arg(long, env = "WORKSHEET_MODEL", default_value = edgequake_worksheet::config::DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature, 0.0–1.0 in steps of 0.1.
    #[arg(long, env = "WORKSHEET_TEMPERATURE", default_value_t = 0.7)]
    temperature: f32,

    /// Extra requirements for the worksheet (grade, duration, focus, ...).
    #[arg(long, conflicts_with = "prompt_file")]
    prompt: Option<String>,

    /// Read the extra requirements from a file.
    #[arg(long)]
    prompt_file: Option<PathBuf>,

    /// Replace the teacher persona and rules with the contents of this file.
    /// The output-format instruction is always appended.
    #[arg(long, env = "WORKSHEET_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Pages to include: all, 5, 3-15, or 1,3,5.
    #[arg(long, default_value = "all")]
    pages: PageSelection,

    /// Pages to leave out, applied after --pages.
    #[arg(long)]
    exclude: Option<PageSelection>,

    /// Write page-NNN.png previews and preview.html into this directory.
    #[arg(long)]
    preview_dir: Option<PathBuf>,

    /// Also write the raw worksheet JSON next to the document.
    /// With --inspect-only, print the page list as JSON.
    #[arg(long)]
    json: bool,

    /// List pages with character counts and exit; no API call.
    #[arg(long)]
    inspect_only: bool,

    /// Print the full system message that would be sent and exit.
    #[arg(long)]
    print_system_prompt: bool,

    /// Maximum completion tokens.
    #[arg(long, env = "WORKSHEET_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: u32,

    /// Maximum characters of source text sent to the model.
    #[arg(long, env = "WORKSHEET_CHAR_LIMIT",
          default_value_t = edgequake_worksheet::config::DEFAULT_SOURCE_CHAR_LIMIT)]
    char_limit: usize,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "WORKSHEET_API_BASE",
          default_value = edgequake_worksheet::config::DEFAULT_API_BASE_URL)]
    api_base: String,

    /// API key.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "WORKSHEET_PDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// TrueType font for PDF output (needed for non-Latin text).
    #[arg(long, env = "WORKSHEET_PDF_FONT")]
    pdf_font: Option<PathBuf>,

    /// Completion request timeout in seconds.
    #[arg(long, env = "WORKSHEET_API_TIMEOUT", default_value_t = 180)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "WORKSHEET_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback that matters; keep library
    // INFO logs out of its way unless asked.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let template = match cli.system_prompt {
        Some(ref path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        None => DEFAULT_SYSTEM_PROMPT.to_string(),
    };

    if cli.print_system_prompt {
        println!("{}", system_message(&template));
        return Ok(());
    }

    let input = cli
        .input
        .clone()
        .context("An input PDF path or URL is required")?;

    let bar = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> =
        bar.clone().map(|b| b as Arc<dyn WorksheetProgressCallback>);
    let config = build_config(&cli, template, progress_cb).await?;

    if let Err(e) = run(&cli, &input, config).await {
        if let Some(ref bar) = bar {
            bar.abandon();
        }
        if !cli.quiet {
            eprintln!("{} {}", red("✘"), e.root_cause());
        }
        return Err(e);
    }
    Ok(())
}

async fn run(cli: &Cli, input: &str, config: WorksheetConfig) -> Result<()> {
    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut doc = inspect(input, &config)
            .await
            .context("Failed to inspect PDF")?;
        select_pages(&mut doc, &cli.pages, cli.exclude.as_ref());
        print_inspection(&doc, cli.json)?;
        return Ok(());
    }

    // ── Load and select ──────────────────────────────────────────────────
    let upload = resolve_input(input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to read {input}"))?;

    let mut session = WorksheetSession::new(config);
    session.load(upload).await.context("Failed to load PDF")?;
    session.apply_selection(&cli.pages)?;
    if let Some(ref exclude) = cli.exclude {
        session.exclude_pages(exclude)?;
    }

    if let Some(ref dir) = cli.preview_dir {
        if let Some(doc) = session.document() {
            write_previews(doc, dir).await?;
            if !cli.quiet {
                eprintln!("Previews written to {}", bold(&dir.display().to_string()));
            }
        }
    }

    if !cli.quiet {
        eprintln!("{}", dim(&session.status()));
    }

    // ── Generate ─────────────────────────────────────────────────────────
    let output = session
        .generate()
        .await
        .context("Worksheet generation failed")?;

    let path = output_path_for(cli.output.as_deref(), &output.document.file_name);
    write_output(&output.document.bytes, &path)
        .await
        .context("Failed to write worksheet")?;

    if cli.json {
        let json_path = path.with_extension("json");
        let json = serde_json::to_string_pretty(&output.worksheet)
            .context("Failed to serialise worksheet")?;
        write_output(json.as_bytes(), &json_path)
            .await
            .context("Failed to write worksheet JSON")?;
    }

    if !cli.quiet {
        let s = &output.stats;
        eprintln!(
            "{}  {}/{} pages  {} chars{}  →  {}",
            green("✔"),
            s.included_pages,
            s.total_pages,
            s.source_chars,
            if s.truncated { " (truncated)" } else { "" },
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms",
            dim(&s.input_tokens.to_string()),
            dim(&s.output_tokens.to_string()),
            s.request_duration_ms + s.render_duration_ms,
        );
    }

    Ok(())
}

/// Map CLI args to `WorksheetConfig`.
async fn build_config(
    cli: &Cli,
    template: String,
    progress: Option<ProgressCallback>,
) -> Result<WorksheetConfig> {
    let user_request = match (&cli.prompt, &cli.prompt_file) {
        (Some(text), _) => Some(text.clone()),
        (None, Some(path)) => Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read prompt from {:?}", path))?,
        ),
        (None, None) => None,
    };

    let mut builder = WorksheetConfig::builder()
        .model(&cli.model)
        .temperature(cli.temperature)
        .output_format(cli.format)
        .system_prompt(template)
        .max_tokens(cli.max_tokens)
        .source_char_limit(cli.char_limit)
        .api_base_url(&cli.api_base)
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout);

    if let Some(request) = user_request {
        builder = builder.user_request(request);
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }
    if let Some(ref font) = cli.pdf_font {
        builder = builder.pdf_font_path(font);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Apply `--pages`, then `--exclude`, to a loaded page list.
fn select_pages(doc: &mut LoadedDocument, pages: &PageSelection, exclude: Option<&PageSelection>) {
    doc.apply_selection(pages);
    if let Some(exclude) = exclude {
        doc.exclude(exclude);
    }
}

fn print_inspection(doc: &LoadedDocument, json: bool) -> Result<()> {
    if json {
        let value = serde_json::json!({
            "name": doc.name,
            "size": doc.size,
            "metadata": doc.metadata,
            "pages": doc.pages,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise pages")?
        );
        return Ok(());
    }

    let meta = &doc.metadata;
    println!("File:         {}", doc.name);
    if let Some(ref t) = meta.title {
        println!("Title:        {}", t);
    }
    if let Some(ref a) = meta.author {
        println!("Author:       {}", a);
    }
    println!("Pages:        {}", meta.page_count);
    println!("PDF Version:  {}", meta.pdf_version);
    println!("Selected:     {} of {}", doc.included_count(), doc.page_count());
    println!();

    for page in &doc.pages {
        let chars = page.text.chars().count();
        let preview: String = page.text.chars().take(60).collect();
        let marker = if !page.included {
            dim("-")
        } else if chars == 0 {
            red("∅")
        } else {
            green("•")
        };
        println!("{} p.{:<4} {:>6} chars  {}", marker, page.page_num, chars, dim(&preview));
    }
    Ok(())
}

async fn write_previews(doc: &LoadedDocument, dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    for preview in &doc.previews {
        let path = dir.join(format!("page-{:03}.png", preview.page_num));
        tokio::fs::write(&path, &preview.png)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let sheet = contact_sheet_html(&doc.name, &doc.previews, &doc.pages);
    let path = dir.join("preview.html");
    tokio::fs::write(&path, sheet)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pdf2worksheet").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    fn included(doc: &LoadedDocument) -> Vec<usize> {
        doc.included_pages().map(|p| p.page_num).collect()
    }

    #[test]
    fn inspect_listing_honours_pages_and_exclude() {
        let cli = parse(&["--inspect-only", "--pages", "2-4", "--exclude", "3", "unit.pdf"]);
        let mut doc = LoadedDocument::from_texts("unit.pdf", ["a", "b", "c", "d", "e"]);

        select_pages(&mut doc, &cli.pages, cli.exclude.as_ref());
        assert_eq!(included(&doc), vec![2, 4]);
        assert_eq!(doc.page_count(), 5);
    }

    #[test]
    fn inspect_listing_defaults_to_every_page() {
        let cli = parse(&["--inspect-only", "unit.pdf"]);
        let mut doc = LoadedDocument::from_texts("unit.pdf", ["a", "b", "c"]);
        doc.toggle_page(2).unwrap();

        select_pages(&mut doc, &cli.pages, cli.exclude.as_ref());
        assert_eq!(included(&doc), vec![1, 2, 3]);
    }

    #[test]
    fn abandon_finishes_the_bar() {
        let cb = CliProgressCallback::new();
        cb.on_extraction_start(3);
        cb.on_page_extracted(1, 3, 10);
        assert!(!cb.bar.is_finished());

        cb.abandon();
        assert!(cb.bar.is_finished());
        // A second failure path clearing again is harmless.
        cb.abandon();
        assert!(cb.bar.is_finished());
    }
}
