//! Word (`.docx`) text extraction.
//!
//! Word documents carry no native pagination, so the extracted paragraph text
//! is windowed into fixed-size pseudo-pages.

use super::{Extraction, ExtractionError, split_pseudo_pages};
use docx_rs::{DocumentChild, ParagraphChild, RunChild};

pub(super) async fn extract(
    bytes: Vec<u8>,
    page_chars: usize,
) -> Result<Extraction, ExtractionError> {
    let text = tokio::task::spawn_blocking(move || {
        let doc = docx_rs::read_docx(&bytes)
            .map_err(|err| ExtractionError::Parse(format!("DOCX parsing failed: {err}")))?;
        Ok::<_, ExtractionError>(collect_text(doc))
    })
    .await
    .map_err(|err| ExtractionError::Parse(format!("extraction task failed: {err}")))??;

    let pages = split_pseudo_pages(&text, page_chars);
    let total_pages = pages.len() as u32;
    Ok(Extraction {
        full_text: text,
        pages,
        total_pages,
    })
}

fn collect_text(doc: docx_rs::Docx) -> String {
    let mut text = String::new();
    for child in doc.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            for child in paragraph.children {
                if let ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    text
}
