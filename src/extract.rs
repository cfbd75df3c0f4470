//! File-type-specific text extraction.
//!
//! Every uploaded document enters the pipeline as a raw byte buffer plus a
//! declared file type. The extractor converts that buffer into plain text
//! partitioned into numbered pages. Formats without native pagination (Word,
//! plain text) are windowed into pseudo-pages of a fixed character size; PDF
//! pseudo-pages are reconstructed by dividing the full text evenly across the
//! reported page count.

mod image;
mod pdf;
mod sheet;
mod word;

use thiserror::Error;

/// Characters per pseudo-page for formats without native pagination.
pub const DEFAULT_PAGE_CHARS: usize = 2000;

/// Default language hint passed to the OCR engine.
pub const DEFAULT_OCR_LANGUAGE: &str = "eng";

/// Closed set of file types the extractor handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// PDF document.
    Pdf,
    /// Word (`.docx`) document.
    Word,
    /// Spreadsheet workbook.
    Spreadsheet,
    /// Image requiring OCR.
    Image,
    /// Plain UTF-8 text.
    PlainText,
}

impl FileType {
    /// Resolve a declared file-type name to a handler, if one is registered.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "word" | "docx" => Some(Self::Word),
            "spreadsheet" | "xlsx" => Some(Self::Spreadsheet),
            "image" => Some(Self::Image),
            "text" | "txt" => Some(Self::PlainText),
            _ => None,
        }
    }
}

/// A single extracted page.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number.
    pub number: u32,
    /// Page text, trimmed.
    pub text: String,
}

/// Result of extracting a document.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Full extracted text of the document.
    pub full_text: String,
    /// Non-empty pages in order.
    pub pages: Vec<Page>,
    /// Reported page count; for PDFs this includes pages whose pseudo-page
    /// slice was empty and therefore absent from `pages`.
    pub total_pages: u32,
}

/// Errors raised while extracting text from a document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Declared file type has no registered handler.
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    /// Extracted text was empty or whitespace-only.
    #[error("document produced no extractable text")]
    EmptyDocument,
    /// The format parser failed on the buffer.
    #[error("failed to parse document: {0}")]
    Parse(String),
    /// The OCR engine failed or is unavailable.
    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// Extractor configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Characters per pseudo-page for Word and plain-text documents.
    pub page_chars: usize,
    /// Language hint for the OCR engine.
    pub ocr_language: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            page_chars: DEFAULT_PAGE_CHARS,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
        }
    }
}

/// Converts raw file buffers into paginated plain text.
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    /// Build an extractor with the given configuration.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Extract text from `bytes` according to the declared file type.
    ///
    /// Fails with [`ExtractionError::Unsupported`] for unknown type names and
    /// [`ExtractionError::EmptyDocument`] when the extracted text is blank
    /// after trimming.
    pub async fn extract(
        &self,
        bytes: Vec<u8>,
        declared: &str,
    ) -> Result<Extraction, ExtractionError> {
        let file_type = FileType::from_name(declared)
            .ok_or_else(|| ExtractionError::Unsupported(declared.to_string()))?;

        let extraction = match file_type {
            FileType::Pdf => pdf::extract(bytes).await?,
            FileType::Word => word::extract(bytes, self.config.page_chars).await?,
            FileType::Spreadsheet => sheet::extract(bytes).await?,
            FileType::Image => image::extract(bytes, &self.config.ocr_language).await?,
            FileType::PlainText => extract_plain_text(&bytes, self.config.page_chars),
        };

        if extraction.full_text.trim().is_empty() {
            return Err(ExtractionError::EmptyDocument);
        }

        tracing::debug!(
            file_type = ?file_type,
            pages = extraction.pages.len(),
            total_pages = extraction.total_pages,
            chars = extraction.full_text.chars().count(),
            "Document extracted"
        );
        Ok(extraction)
    }
}

fn extract_plain_text(bytes: &[u8], page_chars: usize) -> Extraction {
    let text = String::from_utf8_lossy(bytes).into_owned();
    let pages = split_pseudo_pages(&text, page_chars);
    let total_pages = pages.len() as u32;
    Extraction {
        full_text: text,
        pages,
        total_pages,
    }
}

/// Window `text` into fixed-size non-overlapping pseudo-pages.
///
/// Windows that are empty after trimming are discarded; the surviving windows
/// are numbered consecutively starting at 1, so discarded windows leave no
/// numbering gaps. Page numbers are ordinal hints, not stable identifiers.
pub(crate) fn split_pseudo_pages(text: &str, page_chars: usize) -> Vec<Page> {
    let chars: Vec<char> = text.chars().collect();
    let mut pages = Vec::new();

    for window in chars.chunks(page_chars.max(1)) {
        let window: String = window.iter().collect();
        let trimmed = window.trim();
        if trimmed.is_empty() {
            continue;
        }
        pages.push(Page {
            number: pages.len() as u32 + 1,
            text: trimmed.to_string(),
        });
    }

    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_resolution_is_case_insensitive() {
        assert_eq!(FileType::from_name("PDF"), Some(FileType::Pdf));
        assert_eq!(FileType::from_name("word"), Some(FileType::Word));
        assert_eq!(FileType::from_name("heic"), None);
    }

    #[tokio::test]
    async fn unknown_type_is_rejected() {
        let extractor = Extractor::new(ExtractorConfig::default());
        let result = extractor.extract(b"data".to_vec(), "heic").await;
        assert!(matches!(result, Err(ExtractionError::Unsupported(_))));
    }

    #[tokio::test]
    async fn whitespace_only_text_is_rejected() {
        let extractor = Extractor::new(ExtractorConfig::default());
        let result = extractor.extract(b"   \n\t  ".to_vec(), "text").await;
        assert!(matches!(result, Err(ExtractionError::EmptyDocument)));
    }

    #[tokio::test]
    async fn plain_text_is_windowed_into_pseudo_pages() {
        let extractor = Extractor::new(ExtractorConfig::default());
        let body = "inspection protocol ".repeat(300); // exactly 6000 chars
        let extraction = extractor.extract(body.into_bytes(), "text").await.unwrap();
        assert_eq!(extraction.total_pages, 3);
        assert_eq!(extraction.pages.len(), 3);
        assert_eq!(extraction.pages[0].number, 1);
        assert_eq!(extraction.pages[2].number, 3);
    }

    #[test]
    fn pseudo_pages_skip_blank_windows_without_gaps() {
        let mut text = "a".repeat(2000);
        text.push_str(&" ".repeat(2000));
        text.push_str(&"b".repeat(500));
        let pages = split_pseudo_pages(&text, 2000);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].number, 1);
        assert_eq!(pages[1].number, 2);
        assert!(pages[1].text.starts_with('b'));
    }

    #[test]
    fn pseudo_pages_trim_window_edges() {
        let pages = split_pseudo_pages("  edge text  ", 2000);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].text, "edge text");
    }
}
