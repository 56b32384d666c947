//! Web search: provider abstraction, Serper client and TTL-cached decorator.

mod serper;
mod types;

pub use serper::SerperClient;
pub use types::SearchResult;

use std::sync::Arc;

use tracing::debug;

use crate::cache::TtlCache;

/// Upper bound on results requested from a provider per query.
pub const MAX_RESULTS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("SERPER_API_KEY not set")]
    ApiKeyNotSet,

    #[error("search API rejected the credentials")]
    Unauthorized,

    #[error("search API rate limit exceeded")]
    RateLimited,

    #[error("search API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("search request timed out")]
    Timeout,

    #[error("malformed search response: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Abstraction over a web search backend.
/// Implemented by `SerperClient` for production; mock implementations used in tests.
pub trait SearchProvider {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError>;
}

pub type SearchCache = TtlCache<(String, usize), Vec<SearchResult>>;

/// Serves repeated `(query, max_results)` lookups from a shared cache.
pub struct CachedSearch<P> {
    inner: P,
    cache: Arc<SearchCache>,
}

impl<P: SearchProvider> CachedSearch<P> {
    pub fn new(inner: P, cache: Arc<SearchCache>) -> Self {
        Self { inner, cache }
    }
}

impl<P: SearchProvider> SearchProvider for CachedSearch<P> {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let max_results = max_results.clamp(1, MAX_RESULTS);
        let key = (query.to_string(), max_results);
        if let Some(hit) = self.cache.get(&key) {
            debug!(query = %query, "search cache hit");
            return Ok(hit);
        }
        self.cache
            .get_or_try_insert_with(key, || self.inner.search(query, max_results))
            .await
    }
}
