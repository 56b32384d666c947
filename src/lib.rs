//! Government-procedure assistant: web search, bounded-parallel page/PDF
//! extraction, LLM synthesis and optional translation.

pub mod answer;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod language;
pub mod llm;
pub mod markdown;
pub mod pipeline;
pub mod search;

pub const USER_AGENT: &str = concat!("govease/", env!("CARGO_PKG_VERSION"));

pub use config::Config;
pub use language::Language;
pub use pipeline::{Pipeline, PipelineRequest, PipelineResult};
