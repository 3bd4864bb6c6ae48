//! Runtime settings resolved once at start-up from flags, environment and `.env`.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;
use crate::llm::client::{DEFAULT_COMPLETIONS, DEFAULT_REQUEST_TIMEOUT};
use crate::llm::openai::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::llm::retry::DEFAULT_MAX_RETRIES;
use crate::llm::{ClaudeCliService, OpenAiService, RetryPolicy, TextCompletionService};
use crate::prompt::builder::{DEFAULT_CANDIDATE_COUNT, DEFAULT_MAX_PROMPT_CHARS};
use crate::suggest::DEFAULT_MAX_SUGGESTIONS;

pub const PROVIDER_ENV_VAR: &str = "DIFFSCRIBE_PROVIDER";
pub const MODEL_ENV_VAR: &str = "DIFFSCRIBE_MODEL";
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
pub const API_BASE_ENV_VAR: &str = "DIFFSCRIBE_API_BASE";
pub const TIMEOUT_ENV_VAR: &str = "DIFFSCRIBE_TIMEOUT";
pub const MAX_PROMPT_CHARS_ENV_VAR: &str = "DIFFSCRIBE_MAX_PROMPT_CHARS";
pub const CANDIDATES_ENV_VAR: &str = "DIFFSCRIBE_CANDIDATES";
pub const COMPLETIONS_ENV_VAR: &str = "DIFFSCRIBE_COMPLETIONS";
pub const MAX_SUGGESTIONS_ENV_VAR: &str = "DIFFSCRIBE_MAX_SUGGESTIONS";
pub const MAX_RETRIES_ENV_VAR: &str = "DIFFSCRIBE_MAX_RETRIES";

/// Completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Provider {
    #[default]
    OpenAi,
    Claude,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "claude" => Ok(Provider::Claude),
            _ => Err(format!("Unknown provider '{}' (expected openai or claude)", s)),
        }
    }
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub candidate_count: Option<usize>,
    pub completions: Option<usize>,
    pub max_prompt_chars: Option<usize>,
}

/// Immutable settings for one invocation.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub provider: Provider,
    pub model: String,
    pub api_key: Option<String>,
    pub api_base: String,
    pub request_timeout: Duration,
    pub max_prompt_chars: usize,
    /// Suggestions asked for in each response.
    pub candidate_count: usize,
    /// Completions requested from the backend per invocation.
    pub completions: usize,
    pub max_suggestions: usize,
    pub max_retries: u32,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("request_timeout", &self.request_timeout)
            .field("max_prompt_chars", &self.max_prompt_chars)
            .field("candidate_count", &self.candidate_count)
            .field("completions", &self.completions)
            .field("max_suggestions", &self.max_suggestions)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_prompt_chars: DEFAULT_MAX_PROMPT_CHARS,
            candidate_count: DEFAULT_CANDIDATE_COUNT,
            completions: DEFAULT_COMPLETIONS,
            max_suggestions: DEFAULT_MAX_SUGGESTIONS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Read a non-empty environment variable.
fn env_string(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, warning and falling back to `default` when
/// the value is invalid.
fn env_parse<T>(var: &str, default: T, valid: impl Fn(&T) -> bool) -> T
where
    T: FromStr + fmt::Display,
{
    match env_string(var) {
        Some(v) => match v.trim().parse::<T>() {
            Ok(parsed) if valid(&parsed) => parsed,
            _ => {
                warn!("Invalid {} value '{}', using default {}", var, v, default);
                default
            }
        },
        None => default,
    }
}

impl Settings {
    /// Resolve settings from the process environment.
    ///
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Self {
        let defaults = Settings::default();

        let provider = match env_string(PROVIDER_ENV_VAR) {
            Some(v) => v.parse().unwrap_or_else(|e| {
                warn!("{e}; using {}", defaults.provider);
                defaults.provider
            }),
            None => defaults.provider,
        };

        let positive = |n: &usize| *n > 0;
        Self {
            provider,
            model: env_string(MODEL_ENV_VAR).unwrap_or(defaults.model),
            api_key: env_string(API_KEY_ENV_VAR),
            api_base: env_string(API_BASE_ENV_VAR).unwrap_or(defaults.api_base),
            request_timeout: Duration::from_secs(env_parse(
                TIMEOUT_ENV_VAR,
                defaults.request_timeout.as_secs(),
                |s| *s > 0,
            )),
            max_prompt_chars: env_parse(MAX_PROMPT_CHARS_ENV_VAR, defaults.max_prompt_chars, positive),
            candidate_count: env_parse(CANDIDATES_ENV_VAR, defaults.candidate_count, positive),
            completions: env_parse(COMPLETIONS_ENV_VAR, defaults.completions, positive),
            max_suggestions: env_parse(MAX_SUGGESTIONS_ENV_VAR, defaults.max_suggestions, positive),
            max_retries: env_parse(MAX_RETRIES_ENV_VAR, defaults.max_retries, |_| true),
        }
    }

    /// Apply command-line values on top.
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(n) = overrides.candidate_count.filter(|n| *n > 0) {
            self.candidate_count = n;
        }
        if let Some(n) = overrides.completions.filter(|n| *n > 0) {
            self.completions = n;
        }
        if let Some(n) = overrides.max_prompt_chars.filter(|n| *n > 0) {
            self.max_prompt_chars = n;
        }
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_retries(self.max_retries)
    }

    /// Construct the configured completion backend.
    pub fn build_service(&self) -> Result<Arc<dyn TextCompletionService>, ConfigError> {
        match self.provider {
            Provider::OpenAi => {
                let api_key = self.api_key.clone().ok_or(ConfigError::MissingApiKey {
                    var: API_KEY_ENV_VAR,
                })?;
                Ok(Arc::new(
                    OpenAiService::new(api_key, self.model.clone()).with_api_base(self.api_base.clone()),
                ))
            }
            Provider::Claude => Ok(Arc::new(ClaudeCliService::detect()?)),
        }
    }
}
