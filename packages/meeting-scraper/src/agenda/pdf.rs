//! PDF agenda to plain text via lopdf.

use lopdf::Document;
use tracing::debug;

use crate::error::ExtractError;

/// Separator line between pages.
pub const PAGE_BREAK: &str = "\u{c}";

/// Text of every page in page order, pages separated by a form-feed line.
///
/// Pages lopdf cannot decode (scanned images, exotic encodings) contribute
/// empty text rather than failing the whole document.
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let document = Document::load_mem(bytes).map_err(|e| ExtractError::Corrupt(e.to_string()))?;

    let pages = document.get_pages();
    let mut texts = Vec::with_capacity(pages.len());
    for (page_num, page_id) in pages {
        match document.extract_text(&[page_num]) {
            Ok(text) => texts.push(
                text.lines()
                    .map(str::trim_end)
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Err(e) => {
                debug!(page = page_num, id = ?page_id, error = %e, "No text on PDF page");
                texts.push(String::new());
            }
        }
    }

    Ok(texts.join(&format!("\n{PAGE_BREAK}\n")))
}
