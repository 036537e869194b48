//! Post-processing: deterministic cleanup of text entering and leaving the model.
//!
//! Two inputs need scrubbing before they are useful:
//!
//! - **Extracted page text.** pdfium returns text in layout order with hard
//!   line breaks, hyphen-free column wraps, and runs of spaces used for
//!   alignment. The prompt only needs the words, so whitespace is collapsed
//!   to single spaces, matching how the text items of a page read when joined.
//!
//! - **Model output.** Even in JSON mode some models wrap the object in a
//!   ```` ```json ```` fence or prefix a BOM. Stripping those is cheaper than
//!   failing the parse and asking the user to retry.
//!
//! Each rule is a pure `&str → String` function and tested on its own.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalise one page of extracted text.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 2. Collapse every whitespace run (including newlines) to one space
/// 3. Trim both ends
pub fn normalise_page_text(input: &str) -> String {
    let s = remove_invisible_chars(input);
    collapse_whitespace(&s).trim().to_string()
}

/// Clean a completion's message content before JSON parsing.
///
/// Rules (applied in order):
/// 1. Strip invisible Unicode (a leading BOM breaks serde_json)
/// 2. Strip an outer ```` ```json ```` / ```` ``` ```` fence
/// 3. Trim both ends
pub fn clean_json_content(input: &str) -> String {
    let s = remove_invisible_chars(input);
    strip_code_fence(&s).trim().to_string()
}

// ── Rule: strip outer code fence ─────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n(.*)\n\s*```\s*$").unwrap());

fn strip_code_fence(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCE.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule: collapse whitespace ────────────────────────────────────────────

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn collapse_whitespace(input: &str) -> String {
    RE_WHITESPACE.replace_all(input, " ").to_string()
}

// ── Rule: remove invisible Unicode characters ────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_text_whitespace_collapsed() {
        let raw = "  Photosynthesis\r\n  converts   light\n\nenergy.\t ";
        assert_eq!(normalise_page_text(raw), "Photosynthesis converts light energy.");
    }

    #[test]
    fn page_text_invisible_removed() {
        assert_eq!(normalise_page_text("chloro\u{00AD}phyll\u{200B}"), "chlorophyll");
    }

    #[test]
    fn blank_page_is_empty() {
        assert_eq!(normalise_page_text(" \n\t "), "");
    }

    #[test]
    fn json_fence_stripped() {
        let raw = "```json\n{\"title\": \"T\"}\n```";
        assert_eq!(clean_json_content(raw), "{\"title\": \"T\"}");
    }

    #[test]
    fn bare_fence_stripped() {
        let raw = "\n```\n{}\n```\n";
        assert_eq!(clean_json_content(raw), "{}");
    }

    #[test]
    fn bom_removed() {
        assert_eq!(clean_json_content("\u{FEFF}{\"a\":1}"), "{\"a\":1}");
    }

    #[test]
    fn plain_json_untouched() {
        let raw = "{\"title\": \"```not a fence```\"}";
        assert_eq!(clean_json_content(raw), raw);
    }
}
