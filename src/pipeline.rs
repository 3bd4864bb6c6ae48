//! The diff-to-suggestion pipeline: collect, build, complete, parse.

use std::future::Future;

use git2::Repository;
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{ConfigError, PipelineError};
use crate::git::{self, DiffScope};
use crate::llm::CompletionClient;
use crate::prompt::{PromptBuilder, Template};
use crate::suggest::{self, FormatRules, Suggestion, SuggestionKind};

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestRequest {
    pub kind: SuggestionKind,
    /// Explicit comparison base for branch and PR scopes.
    pub base: Option<String>,
    /// PR template; the built-in default when `None`.
    pub template: Option<Template>,
}

impl SuggestRequest {
    pub fn new(kind: SuggestionKind) -> Self {
        Self {
            kind,
            base: None,
            template: None,
        }
    }

    pub fn with_base(mut self, base: Option<String>) -> Self {
        self.base = base;
        self
    }

    pub fn with_template(mut self, template: Option<Template>) -> Self {
        self.template = template;
        self
    }
}

/// Validated suggestions and where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub suggestions: Vec<Suggestion>,
    pub scope: DiffScope,
    /// The diff was cut to fit the prompt.
    pub truncated: bool,
}

/// How a successful run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The diff for `scope` was empty.
    NothingToDo { scope: DiffScope },
    Suggestions(Report),
}

/// One configured pipeline; stateless across runs.
#[derive(Debug, Clone)]
pub struct Pipeline {
    builder: PromptBuilder,
    client: CompletionClient,
    max_suggestions: usize,
}

impl Pipeline {
    pub fn new(builder: PromptBuilder, client: CompletionClient, max_suggestions: usize) -> Self {
        Self {
            builder,
            client,
            max_suggestions: max_suggestions.max(1),
        }
    }

    /// Wire up the configured backend.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let service = settings.build_service()?;
        let client = CompletionClient::new(service)
            .with_candidate_count(settings.completions)
            .with_request_timeout(settings.request_timeout)
            .with_retry_policy(settings.retry_policy());
        Ok(Self::new(
            PromptBuilder::new(settings.max_prompt_chars, settings.candidate_count),
            client,
            settings.max_suggestions,
        ))
    }

    /// Diff scope for a request.
    ///
    /// Branch names on the default branch come from uncommitted work, since the
    /// branch diff there is empty by definition.
    pub fn scope_for(repo: &Repository, request: &SuggestRequest) -> Result<DiffScope, PipelineError> {
        Ok(match request.kind {
            SuggestionKind::Commit => DiffScope::Staged,
            SuggestionKind::PullRequest => DiffScope::Pr,
            SuggestionKind::Branch if request.base.is_none() && git::is_on_default_branch(repo)? => {
                DiffScope::Working
            }
            SuggestionKind::Branch => DiffScope::BranchDiff,
        })
    }

    pub async fn run(&self, repo: &Repository, request: &SuggestRequest) -> Result<Outcome, PipelineError> {
        self.run_cancellable(repo, request, std::future::pending::<()>())
            .await
    }

    /// Run the pipeline, aborting with [`PipelineError::Cancelled`] if `cancel`
    /// completes while the backend is being waited on.
    pub async fn run_cancellable<C>(
        &self,
        repo: &Repository,
        request: &SuggestRequest,
        cancel: C,
    ) -> Result<Outcome, PipelineError>
    where
        C: Future<Output = ()>,
    {
        let scope = Self::scope_for(repo, request)?;
        let change_set = git::collect(repo, scope, request.base.as_deref())?;
        if change_set.is_empty() {
            info!(scope = %scope, "nothing to analyze");
            return Ok(Outcome::NothingToDo { scope });
        }

        let prompt = self
            .builder
            .build(request.kind, &change_set, request.template.as_ref())?;

        let result = tokio::select! {
            result = self.client.complete(&prompt) => result,
            _ = cancel => return Err(PipelineError::Cancelled),
        };
        if let Some(error) = &result.error {
            return Err(error.clone().into());
        }
        debug!(texts = result.texts.len(), "backend responded");

        let rules = FormatRules::for_kind(request.kind, request.template.as_ref());
        let suggestions = suggest::parse(&result, &rules, self.max_suggestions)?;

        Ok(Outcome::Suggestions(Report {
            suggestions,
            scope,
            truncated: prompt.truncated,
        }))
    }
}
