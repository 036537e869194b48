//! DOCX back-end built on `docx-rs`.
//!
//! Headings use named paragraph styles (`Title`, `Heading1`, `Heading2`) so
//! Word's navigation pane and table of contents pick them up.

use super::layout::{Block, Span};
use crate::error::WorksheetError;
use docx_rs::{AlignmentType, BreakType, Docx, Paragraph, Run, Style, StyleType};
use std::io::Cursor;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

fn styles() -> [Style; 3] {
    [
        Style::new("Title", StyleType::Paragraph)
            .name("Title")
            .size(48)
            .bold(),
        Style::new("Heading1", StyleType::Paragraph)
            .name("Heading 1")
            .size(32)
            .bold()
            .color("2F3E9E"),
        Style::new("Heading2", StyleType::Paragraph)
            .name("Heading 2")
            .size(26)
            .bold()
            .color("4F46E5"),
    ]
}

fn run(span: &Span) -> Run {
    let mut run = Run::new().add_text(&span.text);
    if span.bold {
        run = run.bold();
    }
    if span.italic {
        run = run.italic();
    }
    if let Some(hex) = span.tone.hex() {
        run = run.color(hex);
    }
    run
}

fn paragraph(spans: &[Span]) -> Paragraph {
    spans
        .iter()
        .fold(Paragraph::new(), |p, span| p.add_run(run(span)))
}

fn block_paragraph(block: &Block) -> Paragraph {
    match block {
        Block::Title(t) => Paragraph::new()
            .add_run(Run::new().add_text(t))
            .style("Title")
            .align(AlignmentType::Center),
        Block::Centered(spans) => paragraph(spans).align(AlignmentType::Center),
        Block::Heading1(t) => Paragraph::new()
            .add_run(Run::new().add_text(t))
            .style("Heading1"),
        Block::Heading2(t) => Paragraph::new()
            .add_run(Run::new().add_text(t))
            .style("Heading2"),
        Block::Paragraph(spans) => paragraph(spans),
        Block::Bullet(spans) => spans
            .iter()
            .fold(Paragraph::new().add_run(Run::new().add_text("• ")), |p, span| {
                p.add_run(run(span))
            }),
        Block::Indented(t) => Paragraph::new().add_run(Run::new().add_text(format!("    {t}"))),
        Block::Rule => Paragraph::new().add_run(Run::new().add_text(RULE).color("9CA3AF")),
        Block::PageBreak => Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
    }
}

/// Render blocks as a `.docx` file.
pub fn render_docx(blocks: &[Block]) -> Result<Vec<u8>, WorksheetError> {
    let mut doc = Docx::new();
    for style in styles() {
        doc = doc.add_style(style);
    }
    for block in blocks {
        doc = doc.add_paragraph(block_paragraph(block));
    }

    let mut buf = Vec::new();
    doc.build()
        .pack(&mut Cursor::new(&mut buf))
        .map_err(|e| WorksheetError::RenderFailed {
            format: "docx",
            detail: e.to_string(),
        })?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};

    fn paragraph_texts(bytes: &[u8]) -> Vec<String> {
        let docx = read_docx(bytes).expect("docx parses");
        docx.document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(p) => Some(
                    p.children
                        .iter()
                        .filter_map(|c| match c {
                            ParagraphChild::Run(r) => Some(r),
                            _ => None,
                        })
                        .flat_map(|r| r.children.iter())
                        .filter_map(|rc| match rc {
                            RunChild::Text(t) => Some(t.text.clone()),
                            _ => None,
                        })
                        .collect::<String>(),
                ),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn paragraphs_in_order() {
        let blocks = vec![
            Block::Title("Cells".into()),
            Block::Heading1("[A] Key Concepts".into()),
            Block::Bullet(vec![Span::bold("Cell: "), Span::plain("unit of life")]),
            Block::PageBreak,
            Block::Indented("1) nucleus".into()),
        ];
        let bytes = render_docx(&blocks).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let texts = paragraph_texts(&bytes);
        assert_eq!(texts[0], "Cells");
        assert_eq!(texts[1], "[A] Key Concepts");
        assert_eq!(texts[2], "• Cell: unit of life");
        assert_eq!(texts[4].trim(), "1) nucleus");
    }
}
