use std::time::Duration;

use reqwest::Client;
use tracing::{debug, warn};

use super::types::{ApiError, ChatCompletionRequest, ChatCompletionResponse, CompletionRequest};
use super::{LanguageModel, LlmError};
use crate::config::ApiKey;

const API_BASE: &str = "https://api.groq.com/openai/v1";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Chat-completions client for Groq's OpenAI-compatible API.
#[derive(Clone)]
pub struct GroqClient {
    http: Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl GroqClient {
    pub fn new(http: Client, api_key: Option<ApiKey>) -> Self {
        if api_key.is_none() {
            warn!("GROQ_API_KEY not set; answers will be assembled from raw snippets");
        }
        Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn chat_once(&self, api_key: &ApiKey, request: &CompletionRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key.expose())
            .header("User-Agent", crate::USER_AGENT)
            .json(&body)
            .timeout(request.timeout)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("LLM API rate limited");
            return Err(LlmError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if let Ok(body) = serde_json::from_str::<ChatCompletionResponse>(&text)
                && let Some(err) = &body.error
            {
                let classified = classify_api_error(status.as_u16(), err);
                warn!(error = %classified, "LLM API error");
                return Err(classified);
            }
            let end = text.floor_char_boundary(200);
            warn!(status = %status, "LLM API error (no structured body)");
            return Err(LlmError::Api {
                code: status.as_u16(),
                message: format!("HTTP {status}: {}", &text[..end]),
            });
        }

        let body: ChatCompletionResponse = response.json().await.map_err(classify_transport)?;
        if let Some(err) = &body.error {
            let classified = classify_api_error(status.as_u16(), err);
            warn!(error = %classified, "LLM API error in 200 response");
            return Err(classified);
        }

        debug!(model = %request.model, "chat completion complete");
        body.first_text().ok_or(LlmError::EmptyResponse)
    }

    async fn chat_with_retries(&self, api_key: &ApiKey, request: &CompletionRequest) -> Result<String, LlmError> {
        let mut last_err = None;
        for attempt in 0..MAX_RETRIES {
            match self.chat_once(api_key, request).await {
                Ok(text) => return Ok(text),
                Err(e) if is_retriable(&e) => {
                    last_err = Some(e);
                    if attempt + 1 < MAX_RETRIES {
                        let delay_ms = jittered_backoff(attempt);
                        debug!(
                            attempt = attempt + 1,
                            delay_ms, "retrying after transient error"
                        );
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_err.unwrap_or(LlmError::RateLimited))
    }
}

impl LanguageModel for GroqClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let api_key = self.api_key.as_ref().ok_or(LlmError::ApiKeyNotSet)?;
        tokio::time::timeout(request.timeout, self.chat_with_retries(api_key, request))
            .await
            .unwrap_or(Err(LlmError::Timeout))
    }
}

fn is_retriable(e: &LlmError) -> bool {
    matches!(
        e,
        LlmError::RateLimited
            | LlmError::Api {
                code: 500..=599,
                ..
            }
    )
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

fn classify_api_error(status: u16, err: &ApiError) -> LlmError {
    let message = err
        .message
        .clone()
        .unwrap_or_else(|| "Unknown error".to_string());

    match (status, err.kind.as_deref()) {
        (429, _) | (_, Some("rate_limit_exceeded")) => LlmError::RateLimited,
        (401 | 403, _) => LlmError::Unauthorized(message),
        (code, _) => LlmError::Api { code, message },
    }
}

fn classify_transport(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Network(e)
    }
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::llm::types::ChatMessage;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(timeout: Duration) -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user("How do I renew a passport?")],
            model: "test-model".into(),
            temperature: 0.3,
            max_tokens: 1000,
            timeout,
        }
    }

    fn client(server: &MockServer) -> GroqClient {
        GroqClient::new(Client::new(), ApiKey::new("test-key")).with_base_url(&server.uri())
    }

    fn completion(text: &str) -> serde_json::Value {
        serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        })
    }

    #[tokio::test]
    async fn complete_success_returns_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Visit the passport office.")))
            .expect(1)
            .mount(&server)
            .await;

        let text = client(&server)
            .complete(&request(Duration::from_secs(5)))
            .await
            .unwrap();
        assert_eq!(text, "Visit the passport office.");
    }

    #[tokio::test]
    async fn complete_without_key_is_error() {
        let client = GroqClient::new(Client::new(), None).with_base_url("http://localhost:0");
        let result = client.complete(&request(Duration::from_secs(1))).await;
        assert!(matches!(result, Err(LlmError::ApiKeyNotSet)));
    }

    #[tokio::test]
    async fn complete_retries_transient_5xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered")))
            .mount(&server)
            .await;

        let text = client(&server)
            .complete(&request(Duration::from_secs(10)))
            .await
            .unwrap();
        assert_eq!(text, "recovered");
    }

    #[tokio::test]
    async fn complete_does_not_retry_client_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"message": "model not found", "type": "invalid_request_error"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        match client(&server).complete(&request(Duration::from_secs(5))).await {
            Err(LlmError::Api { code: 400, message }) => assert_eq!(message, "model not found"),
            other => panic!("expected Api(400), got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_slow_service_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(completion("too late"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let result = client(&server)
            .complete(&request(Duration::from_millis(200)))
            .await;
        assert!(matches!(result, Err(LlmError::Timeout)), "got: {result:?}");
    }

    #[tokio::test]
    async fn complete_empty_choice_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})))
            .mount(&server)
            .await;

        let result = client(&server).complete(&request(Duration::from_secs(5))).await;
        assert!(matches!(result, Err(LlmError::EmptyResponse)));
    }
}
