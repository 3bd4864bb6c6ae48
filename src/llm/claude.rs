//! Claude Code CLI backend.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BackendError, BackendErrorKind, ConfigError};

use super::service::TextCompletionService;

const PROGRAM: &str = "claude";

/// Claude CLI JSON envelope when using --output-format json
#[derive(serde::Deserialize)]
struct ClaudeCliResponse {
    result: String,
    #[serde(default)]
    is_error: bool,
}

/// Runs `claude -p <prompt> --output-format json`, one completion per call.
#[derive(Debug, Clone)]
pub struct ClaudeCliService {
    program: PathBuf,
}

impl Default for ClaudeCliService {
    fn default() -> Self {
        Self {
            program: PathBuf::from(PROGRAM),
        }
    }
}

impl ClaudeCliService {
    /// Locate the `claude` executable on `PATH`.
    pub fn detect() -> Result<Self, ConfigError> {
        let program = which::which(PROGRAM).map_err(|_| ConfigError::ClaudeNotInstalled)?;
        Ok(Self { program })
    }

    /// Use a specific executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Classify a failure message from the CLI.
fn classify_failure(message: &str) -> BackendErrorKind {
    let lower = message.to_lowercase();
    if lower.contains("rate limit") || lower.contains("429") || lower.contains("overloaded") {
        BackendErrorKind::RateLimited
    } else if lower.contains("api key")
        || lower.contains("authenticat")
        || lower.contains("unauthorized")
        || lower.contains("/login")
    {
        BackendErrorKind::AuthFailure
    } else {
        BackendErrorKind::Unavailable
    }
}

/// Unwrap the JSON envelope, falling back to raw stdout.
fn parse_output(stdout: &str) -> Result<String, BackendError> {
    let content = match serde_json::from_str::<ClaudeCliResponse>(stdout) {
        Ok(envelope) if envelope.is_error => {
            return Err(BackendError::new(classify_failure(&envelope.result), envelope.result));
        }
        Ok(envelope) => envelope.result,
        Err(_) => stdout.to_string(),
    };

    let content = content.trim();
    if content.is_empty() {
        return Err(BackendError::new(BackendErrorKind::Malformed, "empty response from claude"));
    }
    Ok(content.to_string())
}

#[async_trait]
impl TextCompletionService for ClaudeCliService {
    fn name(&self) -> &'static str {
        "claude"
    }

    fn max_candidates_per_request(&self) -> usize {
        1
    }

    async fn send_prompt(
        &self,
        prompt: &str,
        _candidate_count: usize,
    ) -> Result<Vec<String>, BackendError> {
        debug!(program = %self.program.display(), chars = prompt.chars().count(), "running claude");

        // The client's timeout drops this future; the child must not outlive it.
        let output = Command::new(&self.program)
            .arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                BackendError::new(
                    BackendErrorKind::Unavailable,
                    format!("failed to run {}: {e}", self.program.display()),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            let code = output.status.code().unwrap_or(-1);
            let detail = if stderr.is_empty() { stdout } else { stderr };
            return Err(BackendError::new(
                classify_failure(&detail),
                format!("claude exited with code {code}: {detail}"),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_output(&stdout).map(|text| vec![text])
    }
}
