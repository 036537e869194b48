//! PDF back-end built on `printpdf`.
//!
//! printpdf places text at absolute coordinates and does no line breaking,
//! so this module does its own: blocks are wrapped to the printable width
//! using estimated glyph widths, then laid out top to bottom on A4 pages,
//! starting a new page when the bottom margin is reached or a page break
//! block is seen.
//!
//! The built-in Helvetica only covers ASCII reliably; text is folded to
//! ASCII in that mode. Configure a TrueType font for anything else (Korean,
//! Greek, ...).

use super::layout::{Block, Span, Tone};
use crate::error::WorksheetError;
use printpdf::{BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, Rgb};
use std::io::BufWriter;
use std::path::Path;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 0.352_778;
const LINE_SPACING: f32 = 1.35;

/// A line of text at its final position on a page.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PlacedLine {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub tone: Tone,
    pub x_mm: f32,
    /// Baseline, measured from the bottom edge.
    pub y_mm: f32,
}

struct BlockStyle {
    size: f32,
    bold: bool,
    centered: bool,
    indent_mm: f32,
    space_before_mm: f32,
}

fn style_for(block: &Block) -> BlockStyle {
    let base = BlockStyle {
        size: 10.5,
        bold: false,
        centered: false,
        indent_mm: 0.0,
        space_before_mm: 1.5,
    };
    match block {
        Block::Title(_) => BlockStyle {
            size: 20.0,
            bold: true,
            centered: true,
            space_before_mm: 6.0,
            ..base
        },
        Block::Centered(_) => BlockStyle {
            size: 11.0,
            bold: true,
            centered: true,
            space_before_mm: 2.0,
            ..base
        },
        Block::Heading1(_) => BlockStyle {
            size: 15.0,
            bold: true,
            space_before_mm: 6.0,
            ..base
        },
        Block::Heading2(_) => BlockStyle {
            size: 12.5,
            bold: true,
            space_before_mm: 4.0,
            ..base
        },
        Block::Paragraph(spans) => BlockStyle {
            bold: !spans.is_empty() && spans.iter().all(|s| s.bold),
            ..base
        },
        Block::Bullet(_) => BlockStyle {
            indent_mm: 4.0,
            ..base
        },
        Block::Indented(_) => BlockStyle {
            indent_mm: 8.0,
            space_before_mm: 0.5,
            ..base
        },
        Block::Rule => BlockStyle {
            space_before_mm: 4.0,
            ..base
        },
        Block::PageBreak => base,
    }
}

/// The single tone of a block's spans, or plain when they differ.
fn block_tone(block: &Block) -> Tone {
    let spans: &[Span] = match block {
        Block::Centered(s) | Block::Paragraph(s) | Block::Bullet(s) => s,
        Block::Rule => return Tone::Muted,
        _ => return Tone::Plain,
    };
    match spans.split_first() {
        Some((first, rest)) if rest.iter().all(|s| s.tone == first.tone) => first.tone,
        _ => Tone::Plain,
    }
}

fn block_text(block: &Block) -> String {
    match block {
        Block::Bullet(_) => format!("• {}", block.text()),
        Block::Rule => "_".repeat(60),
        _ => block.text(),
    }
}

/// Estimated advance width of `c`, in ems.
fn char_width_em(c: char) -> f32 {
    match c {
        '\u{1100}'..='\u{11FF}'
        | '\u{2E80}'..='\u{9FFF}'
        | '\u{AC00}'..='\u{D7AF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{FF00}'..='\u{FFEF}' => 1.0,
        'i' | 'l' | 'j' | '.' | ',' | '\'' | '|' | '!' | ':' | ';' => 0.28,
        ' ' => 0.28,
        'm' | 'w' | 'M' | 'W' => 0.85,
        c if c.is_uppercase() => 0.68,
        _ => 0.55,
    }
}

fn text_width_em(s: &str) -> f32 {
    s.chars().map(char_width_em).sum()
}

/// Greedy word wrap to `max_em` ems per line. Words wider than a line are
/// split between characters.
pub(crate) fn wrap(text: &str, max_em: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut width = 0.0;
    let space = char_width_em(' ');

    for word in text.split_whitespace() {
        let w = text_width_em(word);
        let needed = if current.is_empty() { w } else { width + space + w };
        if needed <= max_em {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
            width = needed;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
            width = 0.0;
        }
        if w <= max_em {
            current.push_str(word);
            width = w;
        } else {
            for c in word.chars() {
                let cw = char_width_em(c);
                if width + cw > max_em && !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                    width = 0.0;
                }
                current.push(c);
                width += cw;
            }
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Fold text to ASCII for the built-in font.
pub(crate) fn ascii_fold(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            ' '..='~' => out.push(c),
            '\t' | '\n' | '\r' => out.push(' '),
            '•' | '━' | '–' | '—' => out.push('-'),
            '‘' | '’' => out.push('\''),
            '“' | '”' => out.push('"'),
            '…' => out.push_str("..."),
            '✓' => out.push_str("[OK]"),
            '✗' => out.push_str("[X]"),
            _ => out.push('?'),
        }
    }
    out
}

/// Wrap and position every block. Returns one `Vec` per page.
pub(crate) fn paginate(blocks: &[Block], ascii_only: bool) -> Vec<Vec<PlacedLine>> {
    let printable_mm = PAGE_WIDTH_MM - 2.0 * MARGIN_MM;
    let top = PAGE_HEIGHT_MM - MARGIN_MM;

    let mut pages: Vec<Vec<PlacedLine>> = vec![Vec::new()];
    let mut y = top;

    for block in blocks {
        if matches!(block, Block::PageBreak) {
            if pages.last().is_some_and(|p| !p.is_empty()) {
                pages.push(Vec::new());
            }
            y = top;
            continue;
        }

        let style = style_for(block);
        let tone = block_tone(block);
        let mut text = block_text(block);
        if ascii_only {
            text = ascii_fold(&text);
        }

        let em_mm = style.size * PT_TO_MM;
        let line_mm = em_mm * LINE_SPACING;
        let max_em = (printable_mm - style.indent_mm) / em_mm;

        for (i, line) in wrap(&text, max_em).into_iter().enumerate() {
            let gap = if i == 0 { style.space_before_mm } else { 0.0 };
            y -= gap + line_mm;
            if y < MARGIN_MM {
                pages.push(Vec::new());
                y = top - line_mm;
            }

            let x_mm = if style.centered {
                let w = text_width_em(&line) * em_mm;
                MARGIN_MM + ((printable_mm - w) / 2.0).max(0.0)
            } else {
                MARGIN_MM + style.indent_mm
            };

            if let Some(page) = pages.last_mut() {
                page.push(PlacedLine {
                    text: line,
                    size: style.size,
                    bold: style.bold,
                    tone,
                    x_mm,
                    y_mm: y,
                });
            }
        }
    }
    pages
}

fn tone_color(tone: Tone) -> Color {
    let hex = tone.hex().unwrap_or("000000");
    let channel = |i: usize| {
        u8::from_str_radix(hex.get(i..i + 2).unwrap_or("00"), 16).unwrap_or(0) as f32 / 255.0
    };
    Color::Rgb(Rgb::new(channel(0), channel(2), channel(4), None))
}

fn render_err(detail: impl Into<String>) -> WorksheetError {
    WorksheetError::RenderFailed {
        format: "pdf",
        detail: detail.into(),
    }
}

fn load_fonts(
    doc: &PdfDocumentReference,
    font_path: Option<&Path>,
) -> Result<(IndirectFontRef, IndirectFontRef), WorksheetError> {
    match font_path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .map_err(|e| render_err(format!("cannot open font '{}': {e}", path.display())))?;
            let font = doc
                .add_external_font(file)
                .map_err(|e| render_err(format!("cannot load font '{}': {e:?}", path.display())))?;
            Ok((font.clone(), font))
        }
        None => {
            let regular = doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| render_err(format!("{e:?}")))?;
            let bold = doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| render_err(format!("{e:?}")))?;
            Ok((regular, bold))
        }
    }
}

/// Render blocks as an A4 PDF.
pub fn render_pdf(
    title: &str,
    blocks: &[Block],
    font_path: Option<&Path>,
) -> Result<Vec<u8>, WorksheetError> {
    let ascii_only = font_path.is_none();
    let pages = paginate(blocks, ascii_only);
    let doc_title = if ascii_only {
        ascii_fold(title)
    } else {
        title.to_string()
    };

    let (doc, first_page, first_layer) = PdfDocument::new(
        doc_title,
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let (regular, bold) = load_fonts(&doc, font_path)?;

    for (idx, lines) in pages.iter().enumerate() {
        let (page, layer) = if idx == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1")
        };
        let layer_ref = doc.get_page(page).get_layer(layer);

        for line in lines {
            layer_ref.set_fill_color(tone_color(line.tone));
            let font = if line.bold { &bold } else { &regular };
            layer_ref.use_text(line.text.as_str(), line.size, Mm(line.x_mm), Mm(line.y_mm), font);
        }
    }

    let mut buf: Vec<u8> = Vec::new();
    {
        let mut writer = BufWriter::new(&mut buf);
        doc.save(&mut writer).map_err(|e| render_err(format!("{e:?}")))?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog ".repeat(20);
        let lines = wrap(&text, 40.0);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|l| text_width_em(l) <= 40.0));
        assert_eq!(lines.join(" "), text.trim());
    }

    #[test]
    fn wrap_splits_long_words() {
        let word = "x".repeat(100);
        let lines = wrap(&word, 10.0);
        assert!(lines.len() >= 5);
        assert_eq!(lines.concat(), word);
    }

    #[test]
    fn wrap_empty_is_one_blank_line() {
        assert_eq!(wrap("", 10.0), vec![String::new()]);
    }

    #[test]
    fn ascii_fold_replaces_symbols() {
        assert_eq!(ascii_fold("✓ ok • “q” — é"), "[OK] ok - \"q\" - ?");
    }

    #[test]
    fn long_content_paginates_within_margins() {
        let blocks: Vec<Block> = (0..200)
            .map(|i| Block::Paragraph(vec![Span::plain(format!("Paragraph number {i}"))]))
            .collect();
        let pages = paginate(&blocks, true);
        assert!(pages.len() > 1);
        for page in &pages {
            assert!(!page.is_empty());
            for line in page {
                assert!(line.y_mm >= MARGIN_MM);
                assert!(line.y_mm <= PAGE_HEIGHT_MM - MARGIN_MM);
            }
        }
        let count: usize = pages.iter().map(Vec::len).sum();
        assert_eq!(count, 200);
    }

    #[test]
    fn page_break_starts_new_page() {
        let blocks = vec![
            Block::Title("A".into()),
            Block::PageBreak,
            Block::Title("B".into()),
            Block::PageBreak,
            Block::PageBreak,
            Block::Title("C".into()),
        ];
        let pages = paginate(&blocks, true);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[1][0].text, "B");
        assert_eq!(pages[2][0].text, "C");
    }

    #[test]
    fn uniform_tone_is_kept() {
        let block = Block::Paragraph(vec![Span::cite("Evidence: p.4")]);
        assert_eq!(block_tone(&block), Tone::Muted);
        let mixed = Block::Paragraph(vec![Span::toned("✓ ", Tone::Success), Span::plain("x")]);
        assert_eq!(block_tone(&mixed), Tone::Plain);
    }

    fn fixture_text(ws: &crate::worksheet::Worksheet) -> String {
        let blocks = crate::render::layout::layout(ws);
        paginate(&blocks, true)
            .iter()
            .flatten()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn fixture() -> crate::worksheet::Worksheet {
        serde_json::from_str(include_str!("../../tests/fixtures/worksheet.json")).unwrap()
    }

    #[test]
    fn placed_lines_carry_worksheet_content() {
        let text = fixture_text(&fixture());
        for expected in [
            "Photosynthesis & Light",
            "Core Concepts",
            "- Photosynthesis: Plants turn light energy into chemical energy (p.3)",
            "Student Worksheet",
            "1. Which gas do plants take in? (p.3)",
            "Answer Key",
            "MC1: 2",
            "Quality Checklist",
            "[OK] No answers exposed in the student section",
            "[X] Difficulty distribution met",
        ] {
            assert!(text.contains(expected), "missing {expected:?} in {text:?}");
        }
    }

    #[test]
    fn placed_lines_skip_absent_sections() {
        let mut ws = fixture();
        ws.design = None;
        ws.teacher_guide = None;
        ws.quality_check = None;

        let text = fixture_text(&ws);
        assert!(text.contains("Which gas do plants take in?"));
        for gone in ["Core Concepts", "Answer Key", "Essay Rubric", "Quality Checklist", "MC1: 2"] {
            assert!(!text.contains(gone), "{gone:?} should not be placed");
        }
    }

    #[test]
    fn renders_pdf_bytes() {
        let blocks = vec![
            Block::Title("Cells".into()),
            Block::Paragraph(vec![Span::plain("Mitochondria make ATP.")]),
        ];
        let bytes = render_pdf("Cells", &blocks, None).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_font_is_render_error() {
        let err = render_pdf("T", &[], Some(Path::new("/no/such/font.ttf"))).unwrap_err();
        assert!(matches!(err, WorksheetError::RenderFailed { format: "pdf", .. }));
    }
}
