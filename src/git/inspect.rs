//! Repository diagnostics for the `debug` command.

use std::path::PathBuf;

use git2::{Repository, Status, StatusOptions};

use crate::error::GitError;

use super::branch::{current_branch, default_branch, list_branches};
use super::diff::{DiffScope, collect};

/// Characters of diff text shown in a preview.
const PREVIEW_CHARS: usize = 200;

/// One line of porcelain-style status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    /// Two-character code, index column then worktree column (`M `, ` M`, `??`).
    pub code: String,
    pub path: String,
}

/// Size and leading text of one collected diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffPreview {
    pub chars: usize,
    pub preview: String,
}

/// Snapshot of everything the pipeline looks at before prompting.
#[derive(Debug, Clone)]
pub struct RepoReport {
    pub workdir: Option<PathBuf>,
    pub repo_root: PathBuf,
    pub current_branch: Option<String>,
    pub branches: Vec<String>,
    pub status: Vec<StatusEntry>,
    /// Detected default branch, or the reason detection failed.
    pub default_branch: Result<String, String>,
    /// Branch diff preview, or the reason collection failed.
    pub branch_diff: Result<DiffPreview, String>,
    pub staged_diff: Result<DiffPreview, String>,
}

/// Porcelain-style status entries for the working tree, untracked files included.
pub fn status_entries(repo: &Repository) -> Result<Vec<StatusEntry>, GitError> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).recurse_untracked_dirs(true);

    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(GitError::StatusFailed)?;

    Ok(statuses
        .iter()
        .filter_map(|entry| {
            let path = entry.path()?.to_string();
            let status = entry.status();
            if status.is_ignored() {
                return None;
            }
            Some(StatusEntry {
                code: porcelain_code(status),
                path,
            })
        })
        .collect())
}

fn porcelain_code(status: Status) -> String {
    if status.is_wt_new() && !status.is_index_new() {
        return "??".to_string();
    }

    let index = if status.is_index_new() {
        'A'
    } else if status.is_index_modified() {
        'M'
    } else if status.is_index_deleted() {
        'D'
    } else if status.is_index_renamed() {
        'R'
    } else if status.is_index_typechange() {
        'T'
    } else {
        ' '
    };

    let worktree = if status.is_wt_modified() {
        'M'
    } else if status.is_wt_deleted() {
        'D'
    } else if status.is_wt_renamed() {
        'R'
    } else if status.is_wt_typechange() {
        'T'
    } else {
        ' '
    };

    [index, worktree].iter().collect()
}

/// Gather a [`RepoReport`].
///
/// Only branch listing and status are fatal; base detection and diff
/// collection failures are recorded in the report.
pub fn inspect(repo: &Repository) -> Result<RepoReport, GitError> {
    let preview = |scope| {
        collect(repo, scope, None)
            .map(|change_set| DiffPreview {
                chars: change_set.diff_text.chars().count(),
                preview: change_set.diff_text.chars().take(PREVIEW_CHARS).collect(),
            })
            .map_err(|e| e.to_string())
    };

    Ok(RepoReport {
        workdir: repo.workdir().map(|p| p.to_path_buf()),
        repo_root: repo.path().to_path_buf(),
        current_branch: current_branch(repo)?,
        branches: list_branches(repo)?,
        status: status_entries(repo)?,
        default_branch: default_branch(repo)
            .map(|base| base.name)
            .map_err(|e| e.to_string()),
        branch_diff: preview(DiffScope::BranchDiff),
        staged_diff: preview(DiffScope::Staged),
    })
}
