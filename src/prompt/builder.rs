//! Bounded prompt construction.

use tracing::debug;

use crate::error::PromptError;
use crate::git::ChangeSet;
use crate::suggest::SuggestionKind;

use super::sanitize::sanitize_diff;
use super::template::Template;

/// Default prompt cap in characters.
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 12_000;

/// Default number of suggestions requested per response.
pub const DEFAULT_CANDIDATE_COUNT: usize = 3;

/// Changed files listed in the instructions before summarizing the rest.
const MAX_LISTED_FILES: usize = 50;

/// Appended to a truncated diff. Counted against the cap.
pub const TRUNCATION_MARKER: &str = "\n[... diff truncated: remaining hunks omitted ...]\n";

const BRANCH_RULES: &str = "Rules:
- Use kebab-case: lowercase letters, digits and single hyphens only
- Start with a type prefix such as feature/, fix/, refactor/, docs/, chore/ or test/
- Keep names concise and descriptive of the changes
- Follow common Git branch naming conventions";

const COMMIT_RULES: &str = "Rules:
- Use the Conventional Commits format: type(scope): description
- Type is one of feat, fix, docs, style, refactor, perf, test, build, ci, chore, revert
- The scope is optional; append ! before the colon for breaking changes
- Keep the first line at most 50 characters, in the imperative mood, without a trailing period
- Add a body after a blank line only when the change needs explanation
- Write in English";

const PR_RULES: &str = "Rules:
- Keep every header of the template, in the same order, and fill in each section
- Include technical details that help reviewers understand the changes
- Respond with the summary in Markdown only";

/// A prompt ready to send, with its size bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    pub kind: SuggestionKind,
    /// Kind-specific directive placed ahead of the diff. Never truncated.
    pub instructions: String,
    /// Sanitized diff, possibly truncated.
    pub body: String,
    /// Cap on `instructions + body`, in characters.
    pub max_length: usize,
    pub truncated: bool,
}

impl PromptSpec {
    /// Full prompt text.
    pub fn text(&self) -> String {
        let mut text = String::with_capacity(self.instructions.len() + self.body.len());
        text.push_str(&self.instructions);
        text.push_str(&self.body);
        text
    }

    /// Prompt length in characters.
    pub fn len(&self) -> usize {
        self.instructions.chars().count() + self.body.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty() && self.body.is_empty()
    }
}

/// Turns a [`ChangeSet`] into a [`PromptSpec`] for one suggestion kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    max_length: usize,
    candidate_count: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROMPT_CHARS, DEFAULT_CANDIDATE_COUNT)
    }
}

impl PromptBuilder {
    pub fn new(max_length: usize, candidate_count: usize) -> Self {
        Self {
            max_length,
            candidate_count: candidate_count.max(1),
        }
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Build the prompt.
    ///
    /// `template` is only used for PR summaries; `None` selects the built-in
    /// default. The diff is truncated to fit `max_length`; the instructions
    /// never are.
    pub fn build(
        &self,
        kind: SuggestionKind,
        change_set: &ChangeSet,
        template: Option<&Template>,
    ) -> Result<PromptSpec, PromptError> {
        let instructions = match kind {
            SuggestionKind::PullRequest => {
                let default_template;
                let template = match template {
                    Some(t) => t,
                    None => {
                        default_template = Template::default();
                        &default_template
                    }
                };
                self.pr_instructions(change_set, template)
            }
            SuggestionKind::Branch | SuggestionKind::Commit => self.list_instructions(kind, change_set),
        };

        let instructions_len = instructions.chars().count();
        if instructions_len > self.max_length {
            return Err(PromptError::InstructionsTooLong {
                length: instructions_len,
                max: self.max_length,
            });
        }

        let diff = sanitize_diff(&change_set.diff_text);
        let budget = self.max_length - instructions_len;
        let (body, truncated) = fit_diff(&diff, budget).ok_or(PromptError::InstructionsTooLong {
            length: instructions_len + TRUNCATION_MARKER.chars().count(),
            max: self.max_length,
        })?;

        debug!(
            kind = %kind,
            instructions = instructions_len,
            body = body.chars().count(),
            max = self.max_length,
            truncated,
            "built prompt"
        );

        Ok(PromptSpec {
            kind,
            instructions,
            body,
            max_length: self.max_length,
            truncated,
        })
    }

    /// Instructions for branch names and commit messages: a numbered list of
    /// candidates.
    fn list_instructions(&self, kind: SuggestionKind, change_set: &ChangeSet) -> String {
        let (role, rules, noun) = match kind {
            SuggestionKind::Branch => (
                "You are a Git expert. Analyze code changes and suggest appropriate branch names.",
                BRANCH_RULES,
                "branch names",
            ),
            _ => (
                "You are a Git expert. Analyze changes and suggest appropriate commit messages.",
                COMMIT_RULES,
                "commit messages",
            ),
        };

        let mut out = String::new();
        out.push_str(&format!("{role}\n\n"));
        out.push_str(&format!("Analyze the following Git diff and suggest appropriate {noun}.\n\n"));
        out.push_str(&format!("{rules}\n\n"));
        out.push_str(&format!(
            "Please suggest {} {noun} as a numbered list. List the most appropriate one first and add no explanations.\n\n",
            self.candidate_count
        ));
        push_context(&mut out, change_set);
        out.push_str("Git diff:\n");
        out
    }

    fn pr_instructions(&self, change_set: &ChangeSet, template: &Template) -> String {
        let mut out = String::new();
        out.push_str(
            "You are a software development expert. Analyze Git diffs and create appropriate Pull Request summaries.\n\n",
        );
        out.push_str("Analyze the following Git diff and generate a GitHub Pull Request summary.\n\n");
        out.push_str("Template:\n");
        out.push_str(template.raw());
        if !template.raw().ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("\n{PR_RULES}\n\n"));
        push_context(&mut out, change_set);
        out.push_str("Git diff:\n");
        out
    }
}

/// Branch comparison and changed-file list.
fn push_context(out: &mut String, change_set: &ChangeSet) {
    if let (Some(base), Some(head)) = (&change_set.base_ref, &change_set.head_ref) {
        out.push_str(&format!("Branch: {head} (compared against {base})\n\n"));
    }

    if change_set.changed_files.is_empty() {
        return;
    }

    out.push_str(&format!(
        "Changed files ({} additions, {} deletions):\n",
        change_set.additions, change_set.deletions
    ));
    for file in change_set.changed_files.iter().take(MAX_LISTED_FILES) {
        match &file.old_path {
            Some(old) => {
                out.push_str(&format!("- {} ({}, from {})\n", file.path, file.status, old));
            }
            None => {
                out.push_str(&format!("- {} ({})\n", file.path, file.status));
            }
        }
    }
    if change_set.changed_files.len() > MAX_LISTED_FILES {
        out.push_str(&format!(
            "- and {} more\n",
            change_set.changed_files.len() - MAX_LISTED_FILES
        ));
    }
    out.push('\n');
}

/// Fit `diff` into `budget` characters.
///
/// Returns `None` when the diff does not fit and the budget cannot even hold
/// the truncation marker.
fn fit_diff(diff: &str, budget: usize) -> Option<(String, bool)> {
    if diff.chars().count() <= budget {
        return Some((diff.to_string(), false));
    }

    let marker_len = TRUNCATION_MARKER.chars().count();
    if budget <= marker_len {
        return None;
    }
    let keep = budget - marker_len;

    let mut body = keep_leading_hunks(diff, keep);
    if body.is_empty() {
        body = keep_leading_lines(diff, keep);
    }
    if body.is_empty() {
        body = diff.chars().take(keep).collect();
    }
    body.push_str(TRUNCATION_MARKER);

    Some((body, true))
}

/// Split a unified diff into file headers and hunks.
fn split_hunks(diff: &str) -> Vec<&str> {
    let mut starts = vec![0];
    let mut offset = 0;
    for line in diff.split_inclusive('\n') {
        if offset > 0 && (line.starts_with("diff --git ") || line.starts_with("@@")) {
            starts.push(offset);
        }
        offset += line.len();
    }
    starts.push(diff.len());
    starts.windows(2).map(|w| &diff[w[0]..w[1]]).collect()
}

/// Leading segments that fit in `keep` characters, ending on a complete `@@`
/// hunk.
///
/// Empty unless at least one hunk fits. A file header whose first hunk did not
/// fit is dropped with it.
fn keep_leading_hunks(diff: &str, keep: usize) -> String {
    let mut body = String::new();
    let mut used = 0;
    let mut last_hunk_end = 0;
    for hunk in split_hunks(diff) {
        let len = hunk.chars().count();
        if used + len > keep {
            break;
        }
        body.push_str(hunk);
        used += len;
        if hunk.starts_with("@@") {
            last_hunk_end = body.len();
        }
    }
    body.truncate(last_hunk_end);
    body
}

fn keep_leading_lines(diff: &str, keep: usize) -> String {
    let mut body = String::new();
    let mut used = 0;
    for line in diff.split_inclusive('\n') {
        let len = line.chars().count();
        if used + len > keep {
            break;
        }
        body.push_str(line);
        used += len;
    }
    body
}
