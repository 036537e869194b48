//! Prompt assembly: included pages → system and user messages.
//!
//! Page texts are joined with a blank line in page order. The joined text is
//! cut at a fixed number of characters (not bytes, so multi-byte scripts are
//! never split mid-codepoint) before it goes into the user message.

use crate::config::WorksheetConfig;
use crate::document::LoadedDocument;
use crate::error::WorksheetError;
use crate::prompts::{system_message, user_message};
use tracing::{debug, warn};

/// The two messages sent to the model plus bookkeeping about the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessages {
    pub system: String,
    pub user: String,
    /// Characters of source text actually sent.
    pub source_chars: usize,
    /// Whether the source text hit the character cap.
    pub truncated: bool,
}

/// Join the text of every included page, in page order.
///
/// Fails with [`WorksheetError::EmptySelection`] when nothing is included or
/// every included page is blank.
pub fn assemble_source_text(doc: &LoadedDocument) -> Result<String, WorksheetError> {
    let text = doc
        .included_pages()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.trim().is_empty() {
        return Err(WorksheetError::EmptySelection);
    }
    Ok(text)
}

/// Keep at most `cap` characters of `text`.
pub fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the system and user messages for `doc` under `config`.
pub fn build_messages(
    config: &WorksheetConfig,
    doc: &LoadedDocument,
) -> Result<PromptMessages, WorksheetError> {
    let full = assemble_source_text(doc)?;
    let source = truncate_chars(&full, config.source_char_limit);
    let source_chars = source.chars().count();
    let truncated = source.len() < full.len();

    if truncated {
        warn!(
            "Source text truncated to {} of {} characters",
            source_chars,
            full.chars().count()
        );
    }
    debug!(
        "Prompt built from {} of {} pages ({} chars)",
        doc.included_count(),
        doc.page_count(),
        source_chars
    );

    Ok(PromptMessages {
        system: system_message(&config.system_prompt),
        user: user_message(source, config.user_request.as_deref()),
        source_chars,
        truncated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompts::{JSON_FORMAT_SPEC, SOURCE_HEADING, USER_REQUEST_HEADING};

    fn doc() -> LoadedDocument {
        LoadedDocument::from_texts(
            "bio.pdf",
            ["Cells are units.", "Mitochondria make ATP.", "Osmosis moves water."],
        )
    }

    #[test]
    fn joins_included_pages_in_order() {
        let mut d = doc();
        d.toggle_page(2).unwrap();
        let text = assemble_source_text(&d).unwrap();
        assert_eq!(text, "Cells are units.\n\nOsmosis moves water.");
        assert!(!text.contains("Mitochondria"));
    }

    #[test]
    fn nothing_included_is_empty_selection() {
        let mut d = doc();
        d.deselect_all();
        assert!(matches!(
            assemble_source_text(&d),
            Err(WorksheetError::EmptySelection)
        ));
    }

    #[test]
    fn blank_included_pages_are_empty_selection() {
        let d = LoadedDocument::from_texts("scan.pdf", ["", " "]);
        assert!(matches!(
            assemble_source_text(&d),
            Err(WorksheetError::EmptySelection)
        ));
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("광합성작용", 2), "광합");
        assert_eq!(truncate_chars("", 0), "");
    }

    #[test]
    fn messages_respect_char_cap() {
        let long = "x".repeat(50);
        let d = LoadedDocument::from_texts("long.pdf", [long.clone(), long]);
        let config = WorksheetConfig::builder()
            .source_char_limit(30)
            .build()
            .unwrap();

        let msgs = build_messages(&config, &d).unwrap();
        assert_eq!(msgs.source_chars, 30);
        assert!(msgs.truncated);
        assert!(msgs.user.contains(&"x".repeat(30)));
        assert!(!msgs.user.contains(&"x".repeat(31)));
    }

    #[test]
    fn messages_carry_format_spec_and_request() {
        let config = WorksheetConfig::builder()
            .system_prompt("Be concise.")
            .user_request("Focus on page 3")
            .build()
            .unwrap();
        let msgs = build_messages(&config, &doc()).unwrap();

        assert!(msgs.system.starts_with("Be concise."));
        assert!(msgs.system.ends_with(JSON_FORMAT_SPEC));
        assert!(msgs.user.contains(SOURCE_HEADING));
        assert!(msgs.user.contains(USER_REQUEST_HEADING));
        assert!(msgs.user.contains("Focus on page 3"));
        assert!(!msgs.truncated);
    }
}
