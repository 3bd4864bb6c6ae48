//! The completion backend seam.

use async_trait::async_trait;

use crate::error::{BackendError, BackendErrorKind};

/// A text-completion backend.
///
/// Implementations classify every failure into a [`BackendErrorKind`]; retry
/// and timeout handling live in [`CompletionClient`](super::CompletionClient).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextCompletionService: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Most completions one request can return.
    fn max_candidates_per_request(&self) -> usize;

    /// Send `prompt` and return up to `candidate_count` completion texts.
    async fn send_prompt(
        &self,
        prompt: &str,
        candidate_count: usize,
    ) -> Result<Vec<String>, BackendError>;
}

/// Raw backend output for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    /// One entry per successful completion, in request order.
    pub texts: Vec<String>,
    /// Set only when no completion succeeded.
    pub error: Option<BackendError>,
}

impl CompletionResult {
    pub fn success(texts: Vec<String>) -> Self {
        Self { texts, error: None }
    }

    pub fn failure(error: BackendError) -> Self {
        Self {
            texts: Vec::new(),
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<BackendErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    /// All texts joined for display, separated by rules.
    pub fn raw_text(&self) -> String {
        self.texts.join("\n\n---\n\n")
    }
}
