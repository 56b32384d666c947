use serde::Serialize;
use tracing::{info, warn};

use super::LlmSettings;
use crate::language::Language;
use crate::llm::LanguageModel;

/// How the returned text relates to the requested language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    /// Target is the base language; text returned as-is.
    NotRequested,
    Translated,
    /// The translation call failed; text returned untranslated.
    Failed,
    /// Translation was not attempted (e.g. for a fallback answer).
    Skipped,
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub status: TranslationStatus,
}

/// Rewrites `text` into `target`; never fails. On any model error the original
/// text comes back with [`TranslationStatus::Failed`].
pub async fn translate(
    model: &impl LanguageModel,
    settings: &LlmSettings,
    text: &str,
    target: &Language,
) -> Translation {
    if target.is_base() {
        return Translation {
            text: text.to_string(),
            status: TranslationStatus::NotRequested,
        };
    }

    let prompt = format!(
        "Translate the following text to {target}. Keep URLs, numbers and list \
         formatting unchanged, and reply with the translation only.\n\n{text}"
    );
    match model.complete(&settings.request(prompt)).await {
        Ok(translated) => {
            info!(language = %target, "answer translated");
            Translation {
                text: translated,
                status: TranslationStatus::Translated,
            }
        }
        Err(e) => {
            warn!(language = %target, error = %e, "translation failed, returning original text");
            Translation {
                text: text.to_string(),
                status: TranslationStatus::Failed,
            }
        }
    }
}
