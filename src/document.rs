//! The loaded PDF: page records, previews and metadata.
//!
//! A [`LoadedDocument`] is created once per successful extraction and
//! replaced wholesale when another file is loaded. The only mutation it
//! supports is flipping page inclusion flags.

use crate::config::PageSelection;
use crate::error::WorksheetError;
use serde::{Deserialize, Serialize};

/// Extracted text of one page plus its inclusion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-indexed page number.
    pub page_num: usize,
    /// Whitespace-normalised page text. Empty for image-only pages.
    pub text: String,
    /// Whether the page's text goes into the prompt. Defaults to `true`.
    pub included: bool,
}

impl PageRecord {
    pub fn new(page_num: usize, text: impl Into<String>) -> Self {
        Self {
            page_num,
            text: text.into(),
            included: true,
        }
    }
}

/// A rasterised page preview, PNG-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct PagePreview {
    /// 1-indexed page number.
    pub page_num: usize,
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl std::fmt::Debug for PagePreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PagePreview")
            .field("page_num", &self.page_num)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// Document-level metadata read from the PDF info dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

/// A PDF that has been extracted and is ready for page selection.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Name of the uploaded file.
    pub name: String,
    /// Size of the uploaded file in bytes.
    pub size: usize,
    pub metadata: DocumentMetadata,
    /// One record per page, ordered 1..=N.
    pub pages: Vec<PageRecord>,
    /// One preview per page when previews were rendered, else empty.
    pub previews: Vec<PagePreview>,
}

impl LoadedDocument {
    /// Build a document from already-extracted page texts, numbering them
    /// 1..=N with every page included.
    pub fn from_texts<I, S>(name: impl Into<String>, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let pages: Vec<PageRecord> = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PageRecord::new(i + 1, text))
            .collect();
        let metadata = DocumentMetadata {
            page_count: pages.len(),
            ..DocumentMetadata::default()
        };
        Self {
            name: name.into(),
            size: 0,
            metadata,
            pages,
            previews: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page_num: usize) -> Option<&PageRecord> {
        page_num.checked_sub(1).and_then(|i| self.pages.get(i))
    }

    fn page_mut(&mut self, page_num: usize) -> Result<&mut PageRecord, WorksheetError> {
        let total = self.pages.len();
        page_num
            .checked_sub(1)
            .and_then(|i| self.pages.get_mut(i))
            .ok_or(WorksheetError::PageOutOfRange {
                page: page_num,
                total,
            })
    }

    /// Flip one page's inclusion flag and return the new value.
    pub fn toggle_page(&mut self, page_num: usize) -> Result<bool, WorksheetError> {
        let page = self.page_mut(page_num)?;
        page.included = !page.included;
        Ok(page.included)
    }

    pub fn select_all(&mut self) {
        self.pages.iter_mut().for_each(|p| p.included = true);
    }

    pub fn deselect_all(&mut self) {
        self.pages.iter_mut().for_each(|p| p.included = false);
    }

    /// Include exactly the pages in `selection`.
    pub fn apply_selection(&mut self, selection: &PageSelection) {
        for page in &mut self.pages {
            page.included = selection.contains(page.page_num);
        }
    }

    /// Exclude every page in `selection`, leaving the rest untouched.
    pub fn exclude(&mut self, selection: &PageSelection) {
        for page in &mut self.pages {
            if selection.contains(page.page_num) {
                page.included = false;
            }
        }
    }

    /// Included pages in page order.
    pub fn included_pages(&self) -> impl Iterator<Item = &PageRecord> {
        self.pages.iter().filter(|p| p.included)
    }

    pub fn included_count(&self) -> usize {
        self.included_pages().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(n: usize) -> LoadedDocument {
        LoadedDocument::from_texts("lesson.pdf", (1..=n).map(|i| format!("text of page {i}")))
    }

    #[test]
    fn pages_numbered_from_one_and_included() {
        let d = doc(4);
        assert_eq!(d.page_count(), 4);
        let nums: Vec<usize> = d.pages.iter().map(|p| p.page_num).collect();
        assert_eq!(nums, vec![1, 2, 3, 4]);
        assert!(d.pages.iter().all(|p| p.included));
        assert_eq!(d.metadata.page_count, 4);
    }

    #[test]
    fn toggle_twice_restores() {
        let mut d = doc(3);
        assert!(!d.toggle_page(2).unwrap());
        assert!(d.toggle_page(2).unwrap());
        assert!(d.page(2).unwrap().included);
    }

    #[test]
    fn toggle_out_of_range() {
        let mut d = doc(2);
        assert!(matches!(
            d.toggle_page(0),
            Err(WorksheetError::PageOutOfRange { page: 0, total: 2 })
        ));
        assert!(d.toggle_page(3).is_err());
    }

    #[test]
    fn select_and_deselect_all() {
        let mut d = doc(3);
        d.deselect_all();
        assert_eq!(d.included_count(), 0);
        d.select_all();
        assert_eq!(d.included_count(), 3);
    }

    #[test]
    fn apply_selection_and_exclude() {
        let mut d = doc(5);
        d.apply_selection(&PageSelection::Range(2, 4));
        let included: Vec<usize> = d.included_pages().map(|p| p.page_num).collect();
        assert_eq!(included, vec![2, 3, 4]);

        d.exclude(&PageSelection::Single(3));
        let included: Vec<usize> = d.included_pages().map(|p| p.page_num).collect();
        assert_eq!(included, vec![2, 4]);
    }
}
