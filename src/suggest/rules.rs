//! Per-kind format rules.

use crate::prompt::Template;

use super::commit::MAX_SUBJECT_LEN;
use super::{SuggestionKind, branch, commit, pr};

/// Outcome of checking one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Valid, possibly after repair. Demoted candidates rank after all others.
    Accept { content: String, demoted: bool },
    Reject(String),
}

/// Structural rules a candidate must satisfy, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatRules {
    Branch,
    Commit { max_subject_len: usize },
    PullRequest { headers: Vec<String> },
}

impl FormatRules {
    /// Default rules for `kind`. `template` supplies PR headers; `None` uses
    /// the built-in template.
    pub fn for_kind(kind: SuggestionKind, template: Option<&Template>) -> Self {
        match kind {
            SuggestionKind::Branch => FormatRules::Branch,
            SuggestionKind::Commit => FormatRules::Commit {
                max_subject_len: MAX_SUBJECT_LEN,
            },
            SuggestionKind::PullRequest => FormatRules::PullRequest {
                headers: match template {
                    Some(t) => t.headers().to_vec(),
                    None => Template::default().headers().to_vec(),
                },
            },
        }
    }

    pub fn kind(&self) -> SuggestionKind {
        match self {
            FormatRules::Branch => SuggestionKind::Branch,
            FormatRules::Commit { .. } => SuggestionKind::Commit,
            FormatRules::PullRequest { .. } => SuggestionKind::PullRequest,
        }
    }

    /// Split one response text into candidates, in emission order.
    pub fn segment(&self, text: &str) -> Vec<String> {
        match self {
            FormatRules::Branch => branch::segment(text),
            FormatRules::Commit { .. } => commit::segment(text),
            FormatRules::PullRequest { headers } => pr::segment(text, headers),
        }
    }

    pub fn validate(&self, candidate: &str) -> Verdict {
        match self {
            FormatRules::Branch => branch::validate(candidate),
            FormatRules::Commit { max_subject_len } => commit::validate(candidate, *max_subject_len),
            FormatRules::PullRequest { headers } => pr::validate(candidate, headers),
        }
    }
}
