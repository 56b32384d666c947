use serde::Serialize;
use tracing::{info, warn};

use super::LlmSettings;
use crate::fetch::{FetchedDocument, truncate_chars};
use crate::llm::LanguageModel;

const SNIPPET_CHARS: usize = 200;
const DEGRADED_PREAMBLE: &str =
    "Could not process the complete response. Here's what we found in our initial search:";
const NO_DOCUMENTS_NOTE: &str = "No supporting documents could be retrieved for this query.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// Written by the language model.
    Model,
    /// Assembled from document snippets because the model call failed.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

/// Asks the model for requirements, steps and official links; never fails.
/// Any model error yields [`degraded_answer`] instead.
pub async fn synthesize(
    model: &impl LanguageModel,
    settings: &LlmSettings,
    query: &str,
    country: &str,
    documents: &[FetchedDocument],
) -> Answer {
    let prompt = build_prompt(query, country, documents);
    match model.complete(&settings.request(prompt)).await {
        Ok(text) => {
            info!(chars = text.len(), documents = documents.len(), "answer synthesized");
            Answer {
                text,
                source: AnswerSource::Model,
            }
        }
        Err(e) => {
            warn!(error = %e, "synthesis failed, falling back to document snippets");
            Answer {
                text: degraded_answer(documents),
                source: AnswerSource::Degraded,
            }
        }
    }
}

pub fn build_prompt(query: &str, country: &str, documents: &[FetchedDocument]) -> String {
    let available = if documents.is_empty() {
        "No documents could be retrieved. Answer from general knowledge of official \
         procedures and state clearly that no sources were consulted."
            .to_string()
    } else {
        documents
            .iter()
            .map(|doc| {
                format!(
                    "Document: {}\nType: {}\nURL: {}\nContent: {}",
                    doc.title, doc.kind, doc.url, doc.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    };

    format!(
        "Query: {query}\n\
         Country: {country}\n\n\
         Based on the available information, provide a concise response that includes:\n\
         1. Key requirements and documents needed\n\
         2. Basic steps to follow\n\
         3. Relevant official links\n\n\
         If the information is incomplete, please indicate what might be missing.\n\n\
         Available Information:\n\
         {available}"
    )
}

/// Fallback text listing each document's title and the start of its content.
/// Never empty.
pub fn degraded_answer(documents: &[FetchedDocument]) -> String {
    let mut text = DEGRADED_PREAMBLE.to_string();
    if documents.is_empty() {
        text.push(' ');
        text.push_str(NO_DOCUMENTS_NOTE);
        return text;
    }
    for doc in documents {
        text.push_str(&format!(
            "\n\n- {}: {}...",
            doc.title,
            truncate_chars(&doc.content, SNIPPET_CHARS)
        ));
    }
    text
}
