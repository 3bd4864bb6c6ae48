//! Deduplication and ordering of accepted candidates.

use super::{Suggestion, SuggestionKind};

/// Default cap on suggestions shown.
pub const DEFAULT_MAX_SUGGESTIONS: usize = 5;

/// An accepted candidate before ranking, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub content: String,
    pub demoted: bool,
}

/// Case-insensitive, whitespace-collapsed key.
pub fn dedupe_key(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Dedupe (first occurrence wins), move demoted candidates after conforming
/// ones keeping relative order, cap at `max` and assign ranks from 0.
pub fn rank(kind: SuggestionKind, accepted: Vec<Accepted>, max: usize) -> Vec<Suggestion> {
    let mut seen = std::collections::HashSet::new();
    let unique: Vec<Accepted> = accepted
        .into_iter()
        .filter(|a| seen.insert(dedupe_key(&a.content)))
        .collect();

    let (conforming, demoted): (Vec<_>, Vec<_>) = unique.into_iter().partition(|a| !a.demoted);

    conforming
        .into_iter()
        .chain(demoted)
        .take(max)
        .enumerate()
        .map(|(rank, a)| Suggestion {
            rank,
            content: a.content,
            kind,
            demoted: a.demoted,
        })
        .collect()
}
