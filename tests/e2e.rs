//! End-to-end tests that need the pdfium library, and optionally a live API.
//!
//! Gated behind `E2E_ENABLED` so they do not run in CI unless explicitly
//! requested. The live generation test additionally needs `OPENAI_API_KEY`.
//!
//! Run with:
//!   E2E_ENABLED=1 PDFIUM_LIB_PATH=/path/to/libpdfium cargo test --test e2e -- --nocapture

use edgequake_worksheet::render::layout::{Block, Span};
use edgequake_worksheet::render::pdf::render_pdf;
use edgequake_worksheet::{
    generate_to_file, inspect, OutputFormat, PageSelection, PdfUpload, SessionState,
    WorksheetConfig, WorksheetSession,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

macro_rules! e2e_skip_unless_enabled {
    () => {
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP — set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    };
}

/// An `n`-page PDF whose page `k` reads "Page k: ...".
fn sample_pdf(n: usize) -> Vec<u8> {
    let mut blocks = Vec::new();
    for k in 1..=n {
        if k > 1 {
            blocks.push(Block::PageBreak);
        }
        blocks.push(Block::Paragraph(vec![Span::plain(format!(
            "Page {k}: green plants convert light energy into sugar."
        ))]));
    }
    render_pdf("Sample", &blocks, None).expect("sample PDF renders")
}

fn write_sample(dir: &tempfile::TempDir, n: usize) -> PathBuf {
    let path = dir.path().join("sample.pdf");
    std::fs::write(&path, sample_pdf(n)).unwrap();
    path
}

// ── Extraction ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn extracts_one_record_per_page() {
    e2e_skip_unless_enabled!();

    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(&dir, 3);

    let doc = inspect(path.to_string_lossy(), &WorksheetConfig::default())
        .await
        .expect("inspect succeeds");

    assert_eq!(doc.name, "sample.pdf");
    assert_eq!(doc.metadata.page_count, 3);
    assert_eq!(doc.pages.len(), 3);
    for (idx, page) in doc.pages.iter().enumerate() {
        assert_eq!(page.page_num, idx + 1);
        assert!(page.included);
        assert!(
            page.text.contains(&format!("Page {}", idx + 1)),
            "page {} text was {:?}",
            idx + 1,
            page.text
        );
    }
    assert!(doc.previews.is_empty(), "inspect does not render previews");
}

#[tokio::test]
async fn session_load_renders_previews_and_selects() {
    e2e_skip_unless_enabled!();

    let mut session = WorksheetSession::new(WorksheetConfig::default());
    let doc = session
        .load(PdfUpload::from_bytes("sample.pdf", sample_pdf(4)))
        .await
        .expect("load succeeds");

    assert_eq!(doc.previews.len(), 4);
    for preview in &doc.previews {
        assert!(preview.png.starts_with(b"\x89PNG"));
        assert!(preview.width > 0 && preview.height > 0);
    }
    assert!(matches!(session.state(), SessionState::Ready(_)));
    assert_eq!(session.status(), "sample.pdf: 4 of 4 pages selected");

    session
        .exclude_pages(&"2,3".parse::<PageSelection>().unwrap())
        .unwrap();
    assert_eq!(session.status(), "sample.pdf: 2 of 4 pages selected");

    assert!(session.toggle_page(3).unwrap());
    assert_eq!(session.status(), "sample.pdf: 3 of 4 pages selected");
}

#[tokio::test]
async fn not_a_pdf_with_pdf_extension_is_rejected() {
    e2e_skip_unless_enabled!();

    let mut session = WorksheetSession::new(WorksheetConfig::default());
    let err = session
        .load(PdfUpload::from_bytes("fake.pdf", b"just text".to_vec()))
        .await
        .unwrap_err();
    assert!(err.is_validation(), "got {err:?}");
    assert!(matches!(session.state(), SessionState::Idle));
}

// ── Live generation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn live_generation_writes_html() {
    e2e_skip_unless_enabled!();
    if std::env::var("OPENAI_API_KEY").is_err() {
        println!("SKIP — set OPENAI_API_KEY for live generation");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let path = write_sample(&dir, 2);
    let config = WorksheetConfig::builder()
        .output_format(OutputFormat::Html)
        .user_request("Grade 6, 20 minutes")
        .build()
        .unwrap();

    let (output, written) = generate_to_file(path.to_string_lossy(), Some(dir.path()), &config)
        .await
        .expect("generation succeeds");

    println!(
        "wrote {} ({} in / {} out tokens)",
        written.display(),
        output.stats.input_tokens,
        output.stats.output_tokens
    );
    assert!(written.exists());
    assert_eq!(output.stats.total_pages, 2);
    assert_eq!(output.stats.included_pages, 2);
    let html = std::fs::read_to_string(&written).unwrap();
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("Student Worksheet"));
}
