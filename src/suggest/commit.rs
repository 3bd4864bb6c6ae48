//! Conventional Commits candidates.

use std::fmt;
use std::str::FromStr;

use regex_lite::Regex;
use std::sync::LazyLock;

use super::rules::Verdict;
use super::tokenize::{blocks, list_items, strip_bold, strip_fences, strip_inline_markup};

/// Default subject line limit.
pub const MAX_SUBJECT_LEN: usize = 50;

/// `type(scope)!: description`, scope and `!` optional.
static SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\w+)(?:\(([^()\s][^()]*)\))?(!)?: (\S.*)$").expect("Invalid subject regex")
});

/// Conventional commit types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitType {
    Feat,
    Fix,
    Docs,
    Style,
    Refactor,
    Perf,
    Test,
    Build,
    Ci,
    Chore,
    Revert,
}

impl CommitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feat => "feat",
            Self::Fix => "fix",
            Self::Docs => "docs",
            Self::Style => "style",
            Self::Refactor => "refactor",
            Self::Perf => "perf",
            Self::Test => "test",
            Self::Build => "build",
            Self::Ci => "ci",
            Self::Chore => "chore",
            Self::Revert => "revert",
        }
    }
}

impl fmt::Display for CommitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-sensitive: `Feat` is not a commit type.
impl FromStr for CommitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feat" => Ok(Self::Feat),
            "fix" => Ok(Self::Fix),
            "docs" => Ok(Self::Docs),
            "style" => Ok(Self::Style),
            "refactor" => Ok(Self::Refactor),
            "perf" => Ok(Self::Perf),
            "test" => Ok(Self::Test),
            "build" => Ok(Self::Build),
            "ci" => Ok(Self::Ci),
            "chore" => Ok(Self::Chore),
            "revert" => Ok(Self::Revert),
            _ => Err(format!("Unknown commit type: {}", s)),
        }
    }
}

/// A subject line that passed the grammar check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub commit_type: CommitType,
    pub scope: Option<String>,
    pub breaking: bool,
    pub description: String,
}

/// Parse a subject line against the Conventional Commits grammar.
pub fn parse_subject(line: &str) -> Result<Subject, String> {
    let caps = SUBJECT
        .captures(line)
        .ok_or_else(|| format!("'{line}' is not a Conventional Commits subject"))?;

    let type_str = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let commit_type = type_str.parse::<CommitType>().map_err(|_| {
        if type_str.to_lowercase().parse::<CommitType>().is_ok() {
            format!("commit type '{type_str}' must be lowercase")
        } else {
            format!("unknown commit type '{type_str}'")
        }
    })?;

    Ok(Subject {
        commit_type,
        scope: caps.get(2).map(|m| m.as_str().to_string()),
        breaking: caps.get(3).is_some(),
        description: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
    })
}

/// Cut `subject` at the last whitespace that leaves at most `max_len`
/// characters, dropping trailing punctuation.
fn shorten(subject: &str, max_len: usize) -> Option<String> {
    let cut = subject
        .char_indices()
        .take(max_len + 1)
        .filter(|(_, c)| c.is_whitespace())
        .map(|(i, _)| i)
        .last()?;

    let shortened = subject[..cut].trim_end_matches(|c: char| c.is_whitespace() || ",;:-".contains(c));
    Some(shortened.to_string())
}

/// Whether `line` opens a commit message: a subject whose type is a known
/// commit type in any case. `Note:` or `Refs:` paragraphs stay in the body.
fn starts_new_message(line: &str) -> bool {
    let line = strip_inline_markup(line);
    let line = line.trim().trim_matches(|c| c == '"' || c == '\'');
    SUBJECT.captures(line).is_some_and(|caps| {
        caps.get(1)
            .is_some_and(|t| t.as_str().to_lowercase().parse::<CommitType>().is_ok())
    })
}

/// List items, or blank-line blocks regrouped so body paragraphs stay with
/// the subject before them.
pub fn segment(text: &str) -> Vec<String> {
    let text = strip_fences(text);
    let is_subject = |block: &str| starts_new_message(block.lines().next().unwrap_or(""));

    // A bulleted body under a bare subject is not a list of candidates.
    if let Some(items) = list_items(&text) {
        if items.iter().any(|item| is_subject(item)) {
            return items;
        }
    }

    let mut candidates: Vec<String> = Vec::new();
    for block in blocks(&text) {
        match candidates.last_mut() {
            Some(last) if !is_subject(&block) => {
                last.push_str("\n\n");
                last.push_str(&block);
            }
            _ => candidates.push(block),
        }
    }
    candidates
}

pub fn validate(candidate: &str, max_subject_len: usize) -> Verdict {
    let mut lines = candidate.lines();
    let raw_subject = lines.next().unwrap_or("");
    let subject = strip_inline_markup(raw_subject)
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string();

    if let Err(reason) = parse_subject(&subject) {
        return Verdict::Reject(reason);
    }

    let subject = if subject.chars().count() > max_subject_len {
        match shorten(&subject, max_subject_len) {
            Some(short) if parse_subject(&short).is_ok() => short,
            _ => {
                return Verdict::Reject(format!(
                    "subject exceeds {max_subject_len} characters and has no word boundary to cut at"
                ));
            }
        }
    } else {
        subject
    };

    let body: Vec<String> = lines.map(|l| strip_bold(l).trim().to_string()).collect();
    let body = body.join("\n");
    let body = body.trim();

    let content = if body.is_empty() {
        subject
    } else {
        format!("{subject}\n\n{body}")
    };

    Verdict::Accept {
        content,
        demoted: false,
    }
}
