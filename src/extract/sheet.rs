//! Spreadsheet extraction: one page per sheet, in workbook order.

use super::{Extraction, ExtractionError, Page};
use calamine::{Data, Reader};

pub(super) async fn extract(bytes: Vec<u8>) -> Result<Extraction, ExtractionError> {
    tokio::task::spawn_blocking(move || {
        let cursor = std::io::Cursor::new(bytes);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|err| ExtractionError::Parse(format!("workbook parsing failed: {err}")))?;

        let mut full_text = String::new();
        let mut pages = Vec::new();

        for sheet_name in workbook.sheet_names().to_vec() {
            let Ok(range) = workbook.worksheet_range(&sheet_name) else {
                tracing::debug!(sheet = %sheet_name, "Skipping unreadable sheet");
                continue;
            };

            let text = render_sheet(&sheet_name, range.rows());
            if text.trim().is_empty() {
                continue;
            }

            if !full_text.is_empty() {
                full_text.push('\n');
            }
            full_text.push_str(&text);
            pages.push(Page {
                number: pages.len() as u32 + 1,
                text,
            });
        }

        let total_pages = pages.len() as u32;
        Ok(Extraction {
            full_text,
            pages,
            total_pages,
        })
    })
    .await
    .map_err(|err| ExtractionError::Parse(format!("extraction task failed: {err}")))?
}

/// Render a sheet as CSV-like rows prefixed with the sheet name.
///
/// Rows whose cells are all empty contribute nothing; a sheet containing only
/// such rows renders to just its header and is skipped by the caller.
fn render_sheet<'a>(name: &str, rows: impl Iterator<Item = &'a [Data]>) -> String {
    let mut body = String::new();
    for row in rows {
        let cells: Vec<String> = row.iter().map(render_cell).collect();
        if cells.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        body.push_str(&cells.join(","));
        body.push('\n');
    }

    if body.is_empty() {
        String::new()
    } else {
        format!("Sheet: {name}\n{body}")
    }
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        other => other.to_string(),
    }
}
