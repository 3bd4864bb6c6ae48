//! OpenAI chat completions backend.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{BackendError, BackendErrorKind};

use super::service::TextCompletionService;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Upper bound on `n` per request.
const MAX_CHOICES: usize = 8;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Talks to `{api_base}/chat/completions` with a bearer token.
#[derive(Debug, Clone)]
pub struct OpenAiService {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl OpenAiService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Point at a different server (proxies, compatible APIs, tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Map an HTTP error status and body to a failure kind.
///
/// Quota exhaustion arrives as 429 but will not clear on retry, so it is
/// classified with authentication failures.
fn classify_status(status: StatusCode, body: &str) -> BackendError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body).ok().map(|e| e.error);
    let message = detail
        .as_ref()
        .map(|d| d.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect());
    let code = detail.and_then(|d| d.code);

    let kind = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendErrorKind::AuthFailure,
        StatusCode::TOO_MANY_REQUESTS if code.as_deref() == Some("insufficient_quota") => {
            BackendErrorKind::AuthFailure
        }
        StatusCode::TOO_MANY_REQUESTS => BackendErrorKind::RateLimited,
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => BackendErrorKind::Timeout,
        s if s.is_server_error() => BackendErrorKind::Unavailable,
        _ => BackendErrorKind::Malformed,
    };

    BackendError::new(kind, format!("HTTP {}: {}", status.as_u16(), message))
}

fn classify_transport(err: reqwest::Error) -> BackendError {
    let kind = if err.is_timeout() {
        BackendErrorKind::Timeout
    } else if err.is_decode() {
        BackendErrorKind::Malformed
    } else {
        BackendErrorKind::Unavailable
    };
    BackendError::new(kind, err.to_string())
}

#[async_trait]
impl TextCompletionService for OpenAiService {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn max_candidates_per_request(&self) -> usize {
        MAX_CHOICES
    }

    async fn send_prompt(
        &self,
        prompt: &str,
        candidate_count: usize,
    ) -> Result<Vec<String>, BackendError> {
        let url = format!("{}/chat/completions", self.api_base);
        let n = candidate_count.clamp(1, MAX_CHOICES);
        debug!(url = %url, model = %self.model, n, chars = prompt.chars().count(), "sending chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": &self.model,
                "messages": [{ "role": "user", "content": prompt }],
                "n": n,
                "temperature": TEMPERATURE,
            }))
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        let body = response.text().await.map_err(classify_transport)?;
        if !status.is_success() {
            return Err(classify_status(status, &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            BackendError::new(BackendErrorKind::Malformed, format!("invalid response body: {e}"))
        })?;

        let texts: Vec<String> = parsed
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if texts.is_empty() {
            return Err(BackendError::new(
                BackendErrorKind::Malformed,
                "response contained no completion text",
            ));
        }

        debug!(choices = texts.len(), "received chat completion");
        Ok(texts)
    }
}
