use std::fmt;

use serde::Serialize;
use url::Url;

/// Maximum characters of extracted text kept per document.
pub const CONTENT_CHAR_CAP: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Webpage,
    Pdf,
}

impl DocumentKind {
    /// PDF when the URL path ends in `.pdf` (any case); everything else is a web page.
    pub fn from_url(url: &Url) -> Self {
        if url.path().to_ascii_lowercase().ends_with(".pdf") {
            DocumentKind::Pdf
        } else {
            DocumentKind::Webpage
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DocumentKind::Webpage => "webpage",
            DocumentKind::Pdf => "pdf",
        })
    }
}

/// Text extracted from one search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchedDocument {
    pub url: String,
    pub title: String,
    pub content: String,
    pub kind: DocumentKind,
}

impl FetchedDocument {
    /// Normalises whitespace and keeps the first [`CONTENT_CHAR_CAP`] characters.
    /// Returns `None` when nothing is left.
    pub fn new(url: &Url, title: Option<String>, kind: DocumentKind, text: &str) -> Option<Self> {
        let content = truncate_chars(&normalize_whitespace(text), CONTENT_CHAR_CAP).to_string();
        if content.is_empty() {
            return None;
        }
        let title = title
            .map(|t| normalize_whitespace(&t))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title_from_url(url));
        Some(Self {
            url: url.to_string(),
            title,
            content,
            kind,
        })
    }
}

pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Prefix of at most `max_chars` characters, cut on a char boundary.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Last non-empty path segment, else the host, else the whole URL.
fn title_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
        .map(str::to_string)
        .or_else(|| url.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
