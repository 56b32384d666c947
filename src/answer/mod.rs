//! Answer generation: LLM synthesis with a snippet fallback, then optional translation.

mod synthesize;
mod translate;

pub use synthesize::{Answer, AnswerSource, build_prompt, degraded_answer, synthesize};
pub use translate::{Translation, TranslationStatus, translate};

use std::time::Duration;

use crate::llm::{ChatMessage, CompletionRequest};

const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(20);
const TRANSLATION_TIMEOUT: Duration = Duration::from_secs(10);
/// Low temperature keeps procedural answers factual.
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 1000;

/// Model parameters for one kind of LLM call.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl LlmSettings {
    pub fn synthesis(model: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            timeout: SYNTHESIS_TIMEOUT,
        }
    }

    pub fn translation(model: &str) -> Self {
        Self {
            model: model.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            timeout: TRANSLATION_TIMEOUT,
        }
    }

    fn request(&self, prompt: String) -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::user(prompt)],
            model: self.model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        }
    }
}
