//! Response parsing: turn raw backend text into validated, ranked suggestions.

pub mod branch;
pub mod commit;
pub mod pr;
pub mod rank;
pub mod rules;
pub mod tokenize;

use std::fmt;

use tracing::debug;

use crate::error::ParseError;
use crate::llm::CompletionResult;

pub use commit::CommitType;
pub use rank::DEFAULT_MAX_SUGGESTIONS;
pub use rules::{FormatRules, Verdict};

/// The artifact being suggested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    Branch,
    Commit,
    PullRequest,
}

impl SuggestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Branch => "branch name",
            SuggestionKind::Commit => "commit message",
            SuggestionKind::PullRequest => "PR summary",
        }
    }
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated candidate. Rank 0 is the best.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub rank: usize,
    pub content: String,
    pub kind: SuggestionKind,
    /// Valid but off-convention (branch name without a type prefix).
    pub demoted: bool,
}

/// A candidate that failed validation, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub candidate: String,
    pub reason: String,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first_line = self.candidate.lines().next().unwrap_or("");
        write!(f, "{first_line}: {}", self.reason)
    }
}

/// Extract, validate and rank candidates from every response text.
///
/// Texts are read in request order and candidates in emission order, so the
/// backend's own preference survives into the ranking.
pub fn parse(
    result: &CompletionResult,
    rules: &FormatRules,
    max_suggestions: usize,
) -> Result<Vec<Suggestion>, ParseError> {
    let kind = rules.kind();
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();

    for text in &result.texts {
        for candidate in rules.segment(text) {
            match rules.validate(&candidate) {
                Verdict::Accept { content, demoted } => {
                    accepted.push(rank::Accepted { content, demoted });
                }
                Verdict::Reject(reason) => {
                    debug!(kind = %kind, candidate = %candidate, reason = %reason, "rejected candidate");
                    rejected.push(Rejection { candidate, reason });
                }
            }
        }
    }

    let suggestions = rank::rank(kind, accepted, max_suggestions);
    debug!(
        kind = %kind,
        accepted = suggestions.len(),
        rejected = rejected.len(),
        "parsed response"
    );

    if suggestions.is_empty() {
        return Err(ParseError {
            kind,
            raw_response: result.raw_text(),
            rejected,
        });
    }

    Ok(suggestions)
}
