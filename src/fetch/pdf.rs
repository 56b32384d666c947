use lopdf::Document;
use tracing::debug;

use super::FetchError;

/// Leading pages read from each PDF; forms and guides put requirements up front.
pub const MAX_PDF_PAGES: usize = 3;

/// Concatenated text of the first `max_pages` pages. Pages whose text cannot be
/// decoded are skipped; a document that cannot be parsed at all is a `ParseFailure`.
pub(super) fn extract_text(bytes: &[u8], max_pages: usize) -> Result<String, FetchError> {
    let document =
        Document::load_mem(bytes).map_err(|e| FetchError::ParseFailure(format!("PDF: {e}")))?;

    let pages: Vec<u32> = document.get_pages().into_keys().take(max_pages).collect();

    let mut text = String::new();
    for page in pages {
        match document.extract_text(&[page]) {
            Ok(page_text) => {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(&page_text);
            }
            Err(e) => debug!(page, error = %e, "skipping unreadable PDF page"),
        }
    }
    Ok(text)
}
