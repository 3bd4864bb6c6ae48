//! Plain-text rendering of pipeline results.

use crate::error::ParseError;
use crate::git::{DiffScope, RepoReport};
use crate::pipeline::Report;
use crate::suggest::{Suggestion, SuggestionKind};

fn heading(kind: SuggestionKind) -> &'static str {
    match kind {
        SuggestionKind::Branch => "Suggested branch names:",
        SuggestionKind::Commit => "Suggested commit messages:",
        SuggestionKind::PullRequest => "Generated PR summary:",
    }
}

/// Numbered list of suggestions, best first. Multi-line content is indented
/// under its number.
pub fn render_suggestions(kind: SuggestionKind, suggestions: &[Suggestion]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", heading(kind)));

    for suggestion in suggestions {
        let mut lines = suggestion.content.lines();
        let first = lines.next().unwrap_or("");
        let note = if suggestion.demoted { "  (no type prefix)" } else { "" };
        out.push_str(&format!("{}. {first}{note}\n", suggestion.rank + 1));
        for line in lines {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push_str(&format!("   {line}\n"));
            }
        }
        if kind == SuggestionKind::PullRequest {
            out.push('\n');
        }
    }

    out
}

/// Suggestions plus a note when the diff had to be shortened.
pub fn render_report(kind: SuggestionKind, report: &Report) -> String {
    let mut out = render_suggestions(kind, &report.suggestions);
    if report.truncated {
        out.push_str("\nNote: the diff was too large and was truncated before analysis.\n");
    }
    out
}

/// Explain an empty diff and how to produce one.
pub fn render_nothing_to_do(scope: DiffScope) -> String {
    match scope {
        DiffScope::Staged => "No staged changes found.\n\nTip: stage files first with `git add <file>`.\n".to_string(),
        DiffScope::Working => "No changes found in the working tree.\n\nTips:\n  - Make some changes to files first\n  - Or switch to a feature branch with commits\n".to_string(),
        DiffScope::BranchDiff | DiffScope::Pr => "No changes found between this branch and its base.\n\nTips:\n  - Commit your changes to this branch first\n  - Or pass --base <REF> to compare against a different branch\n".to_string(),
    }
}

/// Raw response and per-candidate reasons for manual recovery.
pub fn render_parse_failure(err: &ParseError) -> String {
    let mut out = String::new();
    out.push_str(&format!("No valid {} found in the response.\n", err.kind));
    if !err.rejected.is_empty() {
        out.push_str("\nRejected candidates:\n");
        for rejection in &err.rejected {
            out.push_str(&format!("  - {rejection}\n"));
        }
    }
    out.push_str("\nRaw response:\n");
    out.push_str(err.raw_response.trim_end());
    out.push('\n');
    out
}

/// Human-readable repository diagnostics.
pub fn render_repo_report(report: &RepoReport) -> String {
    let mut out = String::new();
    out.push_str("=== Git Debug Information ===\n\n");

    let workdir = report
        .workdir
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(bare repository)".to_string());
    out.push_str(&format!("Working directory: {workdir}\n"));
    out.push_str(&format!("Git directory: {}\n", report.repo_root.display()));
    out.push_str(&format!(
        "Current branch: {}\n",
        report.current_branch.as_deref().unwrap_or("(detached HEAD)")
    ));

    out.push_str("\nBranches:\n");
    for branch in &report.branches {
        out.push_str(&format!("  {branch}\n"));
    }

    out.push_str("\nStatus:\n");
    if report.status.is_empty() {
        out.push_str("  (clean)\n");
    }
    for entry in &report.status {
        out.push_str(&format!("  {} {}\n", entry.code, entry.path));
    }

    match &report.default_branch {
        Ok(name) => out.push_str(&format!("\nDefault branch: {name}\n")),
        Err(reason) => out.push_str(&format!("\nDefault branch: not found ({reason})\n")),
    }

    for (label, diff) in [("Branch diff", &report.branch_diff), ("Staged diff", &report.staged_diff)] {
        match diff {
            Ok(preview) => {
                out.push_str(&format!("\n{label}: {} characters\n", preview.chars));
                if !preview.preview.is_empty() {
                    out.push_str(&format!("Preview:\n{}\n", preview.preview));
                }
            }
            Err(reason) => out.push_str(&format!("\n{label}: unavailable ({reason})\n")),
        }
    }

    out
}
