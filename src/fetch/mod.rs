//! Content extraction (HTML pages and PDFs) and the bounded-parallel fetch phase.

pub mod coordinator;
mod document;
mod extractor;
mod html;
mod pdf;
mod ssrf;

pub use coordinator::{FanOut, fetch_all};
pub use document::{CONTENT_CHAR_CAP, DocumentKind, FetchedDocument};
pub(crate) use document::truncate_chars;
pub use extractor::{RenderBackend, WebExtractor};
pub use pdf::MAX_PDF_PAGES;
pub use ssrf::HostPolicy;

use std::future::Future;

use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};

/// Bodies above this size are abandoned mid-stream.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("malformed URL: {0}")]
    InvalidUrl(String),

    #[error("unsupported URL scheme, only http and https are fetched")]
    InvalidScheme,

    #[error("refused: host is on a local or private network")]
    InternalHost,

    #[error("could not resolve host: {0}")]
    DnsResolution(String),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server answered with status {0}")]
    Status(u16),

    #[error("body exceeds {} bytes", MAX_BODY_BYTES)]
    TooLarge,

    #[error("no response within {0:?}")]
    Timeout(std::time::Duration),

    #[error("could not parse content: {0}")]
    ParseFailure(String),
}

/// Turns a URL into a document.
///
/// `Ok(None)` means the resource was reachable but held no usable text; callers
/// omit the document either way. The returned future is `Send` so extractions
/// can run on worker tasks.
pub trait ContentExtractor: Send + Sync + 'static {
    fn extract(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Option<FetchedDocument>, FetchError>> + Send;
}

pub(crate) struct Downloaded {
    pub final_url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

/// Collects a successful response body, giving up once it passes [`MAX_BODY_BYTES`].
pub(crate) async fn read_response(mut response: reqwest::Response) -> Result<Downloaded, FetchError> {
    if let Err(e) = response.error_for_status_ref() {
        return Err(e
            .status()
            .map_or(FetchError::Http(e), |s| FetchError::Status(s.as_u16())));
    }
    if response
        .content_length()
        .is_some_and(|declared| declared > MAX_BODY_BYTES as u64)
    {
        return Err(FetchError::TooLarge);
    }

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let mut body = Vec::with_capacity(response.content_length().unwrap_or(0) as usize);
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(FetchError::TooLarge);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(Downloaded {
        final_url,
        content_type,
        body,
    })
}

/// Plain GET of `url`.
pub(crate) async fn download(client: &Client, url: &str) -> Result<Downloaded, FetchError> {
    let response = client
        .get(url)
        .header(USER_AGENT, crate::USER_AGENT)
        .send()
        .await?;
    read_response(response).await
}
