//! diffscribe - Suggest branch names, commit messages and PR summaries from git diffs.
//!
//! # Overview
//!
//! diffscribe collects a diff with git2, turns it into a size-bounded prompt,
//! asks a text-completion backend for several candidates, and keeps only the
//! candidates that satisfy the format rules for the requested artifact
//! (kebab-case branch names, Conventional Commits subjects, templated Markdown).

pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod pipeline;
pub mod present;
pub mod prompt;
pub mod suggest;

// Re-export commonly used types
pub use config::{Provider, Settings};
pub use error::{
    BackendError, BackendErrorKind, ConfigError, GitError, ParseError, PipelineError, PromptError,
    TemplateError,
};
pub use git::{ChangeSet, DiffScope};
pub use llm::{CompletionClient, CompletionResult, TextCompletionService};
pub use pipeline::{Outcome, Pipeline, SuggestRequest};
pub use prompt::{PromptBuilder, PromptSpec, Template};
pub use suggest::{Suggestion, SuggestionKind};
