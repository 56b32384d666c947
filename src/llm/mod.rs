//! Language-model service boundary, shared by synthesis and translation.

mod client;
pub mod types;

pub use client::GroqClient;
pub use types::{ChatMessage, CompletionRequest, Role};

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("GROQ_API_KEY not set")]
    ApiKeyNotSet,

    #[error("LLM API rate limit exceeded")]
    RateLimited,

    #[error("LLM API rejected the credentials: {0}")]
    Unauthorized(String),

    #[error("LLM API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("LLM request timed out")]
    Timeout,

    #[error("LLM returned no text")]
    EmptyResponse,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Abstraction for a chat-completion service.
/// Implemented by `GroqClient` for production; mock implementations used in tests.
pub trait LanguageModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
