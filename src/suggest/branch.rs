//! Branch name candidates.

use regex_lite::Regex;
use std::sync::LazyLock;

use super::rules::Verdict;
use super::tokenize::{list_items, strip_fences, strip_inline_markup};

/// Prefixes that mark a branch name as following the usual conventions.
pub const RECOGNIZED_PREFIXES: [&str; 14] = [
    "feature", "feat", "fix", "bugfix", "hotfix", "refactor", "chore", "docs", "test", "perf",
    "style", "ci", "build", "release",
];

/// Separators after which backends tend to explain their suggestion.
const EXPLANATION_SEPARATORS: [&str; 5] = [" - ", " – ", " — ", ": ", " ("];

static KEBAB_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("Invalid kebab-case regex"));

/// One candidate per list item, or per line when the response is not a list.
pub fn segment(text: &str) -> Vec<String> {
    let text = strip_fences(text);
    match list_items(&text) {
        Some(items) => items
            .iter()
            .filter_map(|item| item.lines().next())
            .map(str::to_string)
            .collect(),
        None => text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Drop a leading `Label: ` in front of the name itself.
///
/// The text before the colon is a label when it has no `/` and either the
/// rest starts with a slashed name or the label reads as prose.
fn strip_label(name: &str) -> &str {
    let Some((label, rest)) = name.split_once(": ") else {
        return name;
    };
    let rest = rest.trim_start();
    if label.contains('/') || rest.is_empty() {
        return name;
    }

    let names_branch = rest
        .split_whitespace()
        .next()
        .is_some_and(|token| token.contains('/'));
    let reads_as_label = label.chars().any(|c| c.is_whitespace() || c.is_uppercase());
    if names_branch || reads_as_label { rest } else { name }
}

/// Strip markup, command wrappers, labels and trailing explanations.
fn clean(candidate: &str) -> String {
    let mut name = strip_inline_markup(candidate);
    if let Some(rest) = name.trim().strip_prefix("git checkout -b ") {
        name = rest.to_string();
    }
    if let Some(rest) = name.trim().strip_prefix("git switch -c ") {
        name = rest.to_string();
    }
    let mut name = strip_label(name.trim()).to_string();

    let mut cut = name.len();
    for sep in EXPLANATION_SEPARATORS {
        if let Some(pos) = name.find(sep) {
            cut = cut.min(pos);
        }
    }
    name.truncate(cut);

    name.trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim_end_matches(['.', ','])
        .to_string()
}

pub fn validate(candidate: &str) -> Verdict {
    let name = clean(candidate);

    if name.is_empty() {
        return Verdict::Reject("empty branch name".to_string());
    }
    if name.chars().any(char::is_whitespace) {
        return Verdict::Reject(format!("'{name}' contains whitespace"));
    }
    if name.chars().any(|c| c.is_uppercase()) {
        return Verdict::Reject(format!("'{name}' is not lowercase"));
    }

    let segments: Vec<&str> = name.split('/').collect();
    if let Some(bad) = segments.iter().find(|s| !KEBAB_SEGMENT.is_match(s)) {
        return Verdict::Reject(format!("segment '{bad}' of '{name}' is not kebab-case"));
    }

    let prefixed = segments.len() > 1 && RECOGNIZED_PREFIXES.contains(&segments[0]);
    Verdict::Accept {
        content: name,
        demoted: !prefixed,
    }
}
