//! Image extraction via the system `tesseract` OCR binary.
//!
//! The buffer is written to a temporary file and recognized as a whole; the
//! result is a single-page extraction. Requires `tesseract` on `PATH`.

use super::{Extraction, ExtractionError, Page};
use std::io::Write;

pub(super) async fn extract(bytes: Vec<u8>, language: &str) -> Result<Extraction, ExtractionError> {
    let mut file = tempfile::NamedTempFile::new()
        .map_err(|err| ExtractionError::Ocr(format!("failed to stage image: {err}")))?;
    file.write_all(&bytes)
        .map_err(|err| ExtractionError::Ocr(format!("failed to stage image: {err}")))?;

    let output = tokio::process::Command::new("tesseract")
        .arg(file.path())
        .arg("stdout")
        .arg("-l")
        .arg(language)
        .output()
        .await
        .map_err(|err| ExtractionError::Ocr(format!("failed to run tesseract: {err}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ExtractionError::Ocr(format!(
            "tesseract exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let pages = if text.is_empty() {
        Vec::new()
    } else {
        vec![Page {
            number: 1,
            text: text.clone(),
        }]
    };

    Ok(Extraction {
        full_text: text,
        pages,
        total_pages: 1,
    })
}
