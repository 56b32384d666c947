//! HTML to plain text: structural elements only, in document order.

use encoding_rs::{Encoding, UTF_8};
use scraper::{Html, Selector};

use super::FetchError;
use super::document::normalize_whitespace;

/// Paragraphs, top-level headings and list items carry the procedural content
/// on most government pages; navigation chrome rarely uses them.
const BLOCK_SELECTOR: &str = "p, h1, h2, h3, li";

pub(super) struct PageText {
    pub title: Option<String>,
    pub text: String,
}

pub(super) fn extract_text(html: &str) -> Result<PageText, FetchError> {
    let blocks = Selector::parse(BLOCK_SELECTOR)
        .map_err(|e| FetchError::ParseFailure(format!("selector: {e}")))?;
    let title_selector =
        Selector::parse("title").map_err(|e| FetchError::ParseFailure(format!("selector: {e}")))?;

    let document = Html::parse_document(html);

    let title = document
        .select(&title_selector)
        .next()
        .map(|el| normalize_whitespace(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let text = document
        .select(&blocks)
        .map(|el| el.text().collect::<String>())
        .filter(|t| !t.trim().is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    Ok(PageText { title, text })
}

/// Decodes a response body using its BOM, else the `Content-Type` charset, else UTF-8.
pub(super) fn decode_body(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return encoding
            .decode_without_bom_handling(&bytes[bom_len..])
            .0
            .into_owned();
    }
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    encoding.decode_without_bom_handling(bytes).0.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}
