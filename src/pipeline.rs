//! Query fulfilment: search, fetch, synthesise, translate.
//!
//! Every stage degrades instead of failing, so [`Pipeline::process_query`]
//! always produces an answer.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Serialize, Serializer};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::answer::{self, AnswerSource, LlmSettings, TranslationStatus};
use crate::cache::TtlCache;
use crate::config::Config;
use crate::fetch::{self, ContentExtractor, FanOut, FetchedDocument, HostPolicy, RenderBackend, WebExtractor};
use crate::language::Language;
use crate::llm::{GroqClient, LanguageModel};
use crate::search::{CachedSearch, SearchProvider, SerperClient};

/// Results requested from the search provider per query.
pub const SEARCH_RESULTS: usize = 5;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub query: String,
    pub country: String,
    pub target_language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Start,
    Searching,
    Fetching,
    Synthesizing,
    Translating,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::Searching => "searching",
            Stage::Fetching => "fetching",
            Stage::Synthesizing => "synthesizing",
            Stage::Translating => "translating",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub answer: String,
    /// In fetch-completion order, not search rank.
    pub documents: Vec<FetchedDocument>,
    #[serde(rename = "elapsed_secs", serialize_with = "as_secs")]
    pub elapsed: Duration,
    pub answer_source: AnswerSource,
    pub translation: TranslationStatus,
    pub stages: Vec<Stage>,
}

impl PipelineResult {
    pub fn elapsed_display(&self) -> String {
        format!("{:.1} seconds", self.elapsed.as_secs_f64())
    }
}

fn as_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

pub struct Pipeline<S, E, M> {
    search: S,
    extractor: Arc<E>,
    model: M,
    fan_out: FanOut,
    synthesis: LlmSettings,
    translation: LlmSettings,
}

/// The production wiring: cached Serper search, web/PDF extraction, Groq models.
pub type DefaultPipeline = Pipeline<CachedSearch<SerperClient>, WebExtractor, GroqClient>;

pub fn http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(HTTP_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
}

impl DefaultPipeline {
    pub fn from_config(config: &Config, http: Client) -> Self {
        let tuning = &config.tuning;
        let search = CachedSearch::new(
            SerperClient::new(http.clone(), config.search_api_key.clone()),
            Arc::new(TtlCache::new(tuning.cache_ttl)),
        );
        let policy = if tuning.allow_private_hosts {
            HostPolicy::AllowPrivate
        } else {
            HostPolicy::PublicOnly
        };
        let extractor = WebExtractor::new(http.clone(), Arc::new(TtlCache::new(tuning.cache_ttl)))
            .with_timeout(tuning.per_fetch_timeout)
            .with_policy(policy)
            .with_render_backend(config.content_api_key.clone().map(RenderBackend::browserless));
        let model = GroqClient::new(http, config.llm_api_key.clone());

        Pipeline::new(search, Arc::new(extractor), model, FanOut::from(tuning)).with_llm_settings(
            LlmSettings::synthesis(&config.synthesis_model),
            LlmSettings::translation(&config.translation_model),
        )
    }
}

impl<S, E, M> Pipeline<S, E, M>
where
    S: SearchProvider,
    E: ContentExtractor,
    M: LanguageModel,
{
    pub fn new(search: S, extractor: Arc<E>, model: M, fan_out: FanOut) -> Self {
        Self {
            search,
            extractor,
            model,
            fan_out,
            synthesis: LlmSettings::synthesis(crate::config::DEFAULT_SYNTHESIS_MODEL),
            translation: LlmSettings::translation(crate::config::DEFAULT_TRANSLATION_MODEL),
        }
    }

    pub fn with_llm_settings(mut self, synthesis: LlmSettings, translation: LlmSettings) -> Self {
        self.synthesis = synthesis;
        self.translation = translation;
        self
    }

    /// Runs one request through every stage. Never fails: search errors yield no
    /// candidates, fetch errors drop documents, a failed synthesis falls back to
    /// snippets and a failed translation keeps the English text.
    pub async fn process_query(&self, request: &PipelineRequest) -> PipelineResult {
        let started = Instant::now();
        let mut stages = vec![Stage::Start];
        info!(query = %request.query, country = %request.country, language = %request.target_language, "processing query");

        enter(&mut stages, Stage::Searching);
        let results = if request.query.trim().is_empty() {
            warn!("blank query, skipping search");
            Vec::new()
        } else {
            let search_query = enrich_query(&request.query, &request.country);
            match self.search.search(&search_query, SEARCH_RESULTS).await {
                Ok(results) => {
                    info!(results = results.len(), "search complete");
                    results
                }
                Err(e) => {
                    warn!(error = %e, "search failed, continuing without candidates");
                    Vec::new()
                }
            }
        };

        enter(&mut stages, Stage::Fetching);
        let documents = fetch::fetch_all(Arc::clone(&self.extractor), &results, &self.fan_out).await;

        enter(&mut stages, Stage::Synthesizing);
        let answer = answer::synthesize(
            &self.model,
            &self.synthesis,
            &request.query,
            &request.country,
            &documents,
        )
        .await;

        let (text, translation) = if request.target_language.is_base() {
            (answer.text, TranslationStatus::NotRequested)
        } else if answer.source == AnswerSource::Degraded {
            (answer.text, TranslationStatus::Skipped)
        } else {
            enter(&mut stages, Stage::Translating);
            let translated = answer::translate(
                &self.model,
                &self.translation,
                &answer.text,
                &request.target_language,
            )
            .await;
            (translated.text, translated.status)
        };

        enter(&mut stages, Stage::Done);
        let elapsed = started.elapsed();
        info!(
            documents = documents.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "query complete"
        );

        PipelineResult {
            answer: text,
            documents,
            elapsed,
            answer_source: answer.source,
            translation,
            stages,
        }
    }
}

fn enter(stages: &mut Vec<Stage>, stage: Stage) {
    info!(stage = %stage, "pipeline stage");
    stages.push(stage);
}

/// Steers the search provider toward official sources for the given country.
pub fn enrich_query(query: &str, country: &str) -> String {
    format!("{} {} government documents", query.trim(), country.trim())
}
