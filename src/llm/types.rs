use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Provider-neutral completion call: `{messages, model, temperature, maxTokens, timeout}`.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Bounds the whole call, retries included.
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChatCompletionResponse {
    pub choices: Option<Vec<Choice>>,
    pub error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Choice {
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ApiError {
    pub message: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice, if any non-blank text was generated.
    pub fn first_text(&self) -> Option<String> {
        self.choices
            .as_ref()?
            .first()?
            .message
            .as_ref()?
            .content
            .as_ref()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}
