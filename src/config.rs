//! Process configuration: provider credentials and pipeline tunables.
//!
//! Values come from the environment (optionally seeded from a `.env` file by the
//! binary). Missing credentials are not an error here: the component that needs
//! them degrades instead.

use std::env;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_SYNTHESIS_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TRANSLATION_MODEL: &str = "llama-3.3-70b-versatile";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key}={value:?} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Secret credential; `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Fan-out, timeout and cache knobs. None of the defaults are load-bearing.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Maximum number of search results fetched per query.
    pub fan_out_width: usize,
    /// Maximum number of extractions in flight at once.
    pub fetch_workers: usize,
    pub per_fetch_timeout: Duration,
    /// Wall-clock budget for the whole fetch phase.
    pub overall_fetch_budget: Duration,
    pub cache_ttl: Duration,
    /// Permit fetching loopback/private hosts (local testing only).
    pub allow_private_hosts: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            fan_out_width: 3,
            fetch_workers: 3,
            per_fetch_timeout: Duration::from_secs(5),
            overall_fetch_budget: Duration::from_secs(30),
            cache_ttl: Duration::from_secs(3600),
            allow_private_hosts: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub search_api_key: Option<ApiKey>,
    pub content_api_key: Option<ApiKey>,
    pub llm_api_key: Option<ApiKey>,
    pub synthesis_model: String,
    pub translation_model: String,
    pub tuning: Tuning,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let key = |name: &str| lookup(name).as_deref().and_then(ApiKey::new);
        let text = |name: &str, default: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let defaults = Tuning::default();
        let tuning = Tuning {
            fan_out_width: positive(&lookup, "GOVEASE_FAN_OUT", defaults.fan_out_width as u64)?
                as usize,
            fetch_workers: positive(&lookup, "GOVEASE_FETCH_WORKERS", defaults.fetch_workers as u64)?
                as usize,
            per_fetch_timeout: Duration::from_secs(positive(
                &lookup,
                "GOVEASE_FETCH_TIMEOUT_SECS",
                defaults.per_fetch_timeout.as_secs(),
            )?),
            overall_fetch_budget: Duration::from_secs(positive(
                &lookup,
                "GOVEASE_FETCH_BUDGET_SECS",
                defaults.overall_fetch_budget.as_secs(),
            )?),
            cache_ttl: Duration::from_secs(positive(
                &lookup,
                "GOVEASE_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            allow_private_hosts: flag(&lookup, "GOVEASE_ALLOW_PRIVATE_HOSTS")?,
        };

        Ok(Self {
            search_api_key: key("SERPER_API_KEY"),
            content_api_key: key("BROWSERLESS_API_KEY"),
            llm_api_key: key("GROQ_API_KEY"),
            synthesis_model: text("GROQ_MODEL", DEFAULT_SYNTHESIS_MODEL),
            translation_model: text("GROQ_TRANSLATION_MODEL", DEFAULT_TRANSLATION_MODEL),
            tuning,
        })
    }
}

fn positive(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    let Some(raw) = lookup(key).filter(|v| !v.trim().is_empty()) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "must be greater than zero",
        }),
        Ok(n) => Ok(n),
        Err(_) => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected a whole number",
        }),
    }
}

fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<bool, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw,
            reason: "expected true/false",
        }),
    }
}
