//! Error types for diffscribe modules using thiserror.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::suggest::{Rejection, SuggestionKind};

/// Errors from repository queries. None of these are retried.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository. Run diffscribe from within a git repository: {0}")]
    NotARepository(#[source] git2::Error),

    #[error(
        "No base branch found: none of main, master, origin/main or origin/master exist. Pass --base <REF> to choose one."
    )]
    NoBaseBranch,

    #[error("Failed to find reference '{0}': {1}")]
    ReferenceNotFound(String, #[source] git2::Error),

    #[error("Failed to collect diff: {0}")]
    DiffFailed(#[source] git2::Error),

    #[error("Failed to read repository status: {0}")]
    StatusFailed(#[source] git2::Error),
}

/// Errors from prompt construction.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PromptError {
    #[error(
        "Prompt instructions need {length} characters but the prompt limit is {max}; raise --max-prompt-chars"
    )]
    InstructionsTooLong { length: usize, max: usize },
}

/// Failure categories reported by a completion backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendErrorKind {
    Timeout,
    RateLimited,
    AuthFailure,
    Malformed,
    Unavailable,
}

impl BackendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendErrorKind::Timeout => "timeout",
            BackendErrorKind::RateLimited => "rate limited",
            BackendErrorKind::AuthFailure => "authentication failure",
            BackendErrorKind::Malformed => "malformed request",
            BackendErrorKind::Unavailable => "backend unavailable",
        }
    }

    /// Whether another attempt has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendErrorKind::Timeout | BackendErrorKind::RateLimited | BackendErrorKind::Unavailable
        )
    }
}

impl fmt::Display for BackendErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified completion backend failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: BackendErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: BackendErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// The backend answered but no candidate satisfied the format rules.
///
/// Carries the raw response so the caller can show it for manual recovery.
#[derive(Error, Debug)]
#[error("Backend response contained no valid {kind} ({} candidate(s) rejected)", .rejected.len())]
pub struct ParseError {
    pub kind: SuggestionKind,
    pub raw_response: String,
    pub rejected: Vec<Rejection>,
}

/// Errors from loading a PR template file.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from resolving runtime configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{var} is not set. Export it or add it to a .env file in the working directory.")]
    MissingApiKey { var: &'static str },

    #[error("Claude Code CLI not found. Install with: npm install -g @anthropic-ai/claude-code")]
    ClaudeNotInstalled,
}

/// A pipeline failure, tagged with the stage that produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Environment(#[from] GitError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Cancelled while waiting for the completion backend")]
    Cancelled,
}

impl PipelineError {
    /// Human-readable name of the failing stage.
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Environment(_) => "diff collection",
            PipelineError::Prompt(_) => "prompt construction",
            PipelineError::Backend(_) | PipelineError::Cancelled => "completion backend",
            PipelineError::Parse(_) => "response parsing",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(BackendErrorKind::Timeout.is_transient());
        assert!(BackendErrorKind::RateLimited.is_transient());
        assert!(BackendErrorKind::Unavailable.is_transient());
        assert!(!BackendErrorKind::AuthFailure.is_transient());
        assert!(!BackendErrorKind::Malformed.is_transient());
    }

    #[test]
    fn test_backend_error_display_includes_kind() {
        let err = BackendError::new(BackendErrorKind::RateLimited, "slow down");
        assert_eq!(err.to_string(), "rate limited: slow down");
    }

    #[test]
    fn test_pipeline_error_stage() {
        let err = PipelineError::from(GitError::NoBaseBranch);
        assert_eq!(err.stage(), "diff collection");

        let err = PipelineError::from(BackendError::new(BackendErrorKind::Timeout, "t"));
        assert_eq!(err.stage(), "completion backend");
        assert!(err.to_string().contains("timeout"));
    }
}
