//! PDF text extraction with pseudo-pagination.
//!
//! `pdf-extract` yields the document's full text but no per-page offsets, so
//! pages are reconstructed by dividing the text length evenly across the page
//! count reported by `lopdf`.

use super::{Extraction, ExtractionError, Page};

pub(super) async fn extract(bytes: Vec<u8>) -> Result<Extraction, ExtractionError> {
    let (text, reported_pages) = tokio::task::spawn_blocking(move || {
        let text = pdf_extract::extract_text_from_mem(&bytes)
            .map_err(|err| ExtractionError::Parse(format!("PDF extraction failed: {err}")))?;
        let reported_pages = match lopdf::Document::load_mem(&bytes) {
            Ok(doc) => doc.get_pages().len().max(1) as u32,
            Err(err) => {
                tracing::debug!(error = %err, "Could not read PDF page count; assuming one page");
                1
            }
        };
        Ok::<_, ExtractionError>((text, reported_pages))
    })
    .await
    .map_err(|err| ExtractionError::Parse(format!("extraction task failed: {err}")))??;

    Ok(paginate_evenly(text, reported_pages))
}

/// Slice `full_text` into `total_pages` even character ranges.
///
/// Page `i` (0-based) covers `[floor(i*len/total), floor((i+1)*len/total))`.
/// Slices that are empty after trimming are omitted from `pages` but still
/// counted in `total_pages`; surviving pages keep their original number.
fn paginate_evenly(full_text: String, total_pages: u32) -> Extraction {
    let chars: Vec<char> = full_text.chars().collect();
    let len = chars.len();
    let total = total_pages.max(1) as usize;

    let mut pages = Vec::new();
    for i in 0..total {
        let start = i * len / total;
        let end = (i + 1) * len / total;
        let slice: String = chars[start..end].iter().collect();
        let trimmed = slice.trim();
        if trimmed.is_empty() {
            continue;
        }
        pages.push(Page {
            number: i as u32 + 1,
            text: trimmed.to_string(),
        });
    }

    Extraction {
        full_text,
        pages,
        total_pages: total as u32,
    }
}
