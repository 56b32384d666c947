use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{SearchResult, SerperRequest, SerperResponse};
use super::{SearchError, SearchProvider};
use crate::config::ApiKey;

const API_URL: &str = "https://google.serper.dev/search";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Google search through the Serper API.
#[derive(Clone)]
pub struct SerperClient {
    http: Client,
    api_key: Option<ApiKey>,
    endpoint: String,
    timeout: Duration,
}

impl SerperClient {
    pub fn new(http: Client, api_key: Option<ApiKey>) -> Self {
        if api_key.is_none() {
            warn!("SERPER_API_KEY not set; searches will return no results");
        }
        Self {
            http,
            api_key,
            endpoint: API_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl SearchProvider for SerperClient {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, SearchError> {
        let api_key = self.api_key.as_ref().ok_or(SearchError::ApiKeyNotSet)?;

        let response = self
            .http
            .post(&self.endpoint)
            .header("X-API-KEY", api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&SerperRequest {
                q: query,
                num: max_results,
            })
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(SearchError::RateLimited);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(SearchError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<SerperResponse>(&text)
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| {
                    let end = text.floor_char_boundary(200);
                    text[..end].to_string()
                });
            return Err(SearchError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: SerperResponse = response.json().await.map_err(classify_transport)?;
        let results = body.into_results(max_results);
        debug!(query = %query, results = results.len(), "serper search complete");
        Ok(results)
    }
}

fn classify_transport(e: reqwest::Error) -> SearchError {
    if e.is_timeout() {
        SearchError::Timeout
    } else if e.is_decode() {
        SearchError::Malformed(e.to_string())
    } else {
        SearchError::Network(e)
    }
}
