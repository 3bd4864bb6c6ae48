//! Diff collection for each analysis scope using git2.

use std::fmt;

use git2::{Delta, Diff, DiffFormat, DiffOptions, ErrorCode, Repository, Tree};
use tracing::debug;

use crate::error::GitError;

use super::branch::{current_branch, resolve_base};

/// Diffs whose trimmed text is shorter than this carry nothing worth analyzing.
const MIN_DIFF_LENGTH: usize = 10;

/// Which changes a [`ChangeSet`] covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffScope {
    /// Index against `HEAD`.
    Staged,
    /// Current branch tip against the default branch.
    BranchDiff,
    /// Same scope as `BranchDiff`, collected for a PR summary.
    Pr,
    /// Staged, unstaged and untracked changes against `HEAD`.
    Working,
}

impl DiffScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiffScope::Staged => "staged",
            DiffScope::BranchDiff => "branch-diff",
            DiffScope::Pr => "pr",
            DiffScope::Working => "working",
        }
    }
}

impl fmt::Display for DiffScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a changed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file touched by the diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    pub path: String,
    pub status: FileStatus,
    /// Old path for renamed files (None for non-rename changes).
    pub old_path: Option<String>,
}

/// The diff and metadata under analysis for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub scope: DiffScope,
    pub diff_text: String,
    pub changed_files: Vec<ChangedFile>,
    /// Base branch or ref; set only for branch comparisons.
    pub base_ref: Option<String>,
    /// Branch being compared; set only for branch comparisons.
    pub head_ref: Option<String>,
    pub additions: usize,
    pub deletions: usize,
}

impl ChangeSet {
    /// An empty change set ends the pipeline with "nothing to do".
    pub fn is_empty(&self) -> bool {
        self.diff_text.trim().len() < MIN_DIFF_LENGTH
    }
}

/// Resolve the HEAD tree, distinguishing empty-repo errors from real failures.
///
/// Returns `Ok(None)` for repos with no commits (unborn branch / not found).
fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::DiffFailed)?;
    Ok(Some(tree))
}

/// Collect the diff for `scope`.
///
/// `base_override` replaces default-branch detection for branch comparisons and
/// is ignored otherwise. Read-only: the repository is never modified.
pub fn collect(
    repo: &Repository,
    scope: DiffScope,
    base_override: Option<&str>,
) -> Result<ChangeSet, GitError> {
    let change_set = match scope {
        DiffScope::Staged => {
            let head_tree = resolve_head_tree(repo)?;
            let staged = repo
                .diff_tree_to_index(head_tree.as_ref(), None, None)
                .map_err(GitError::DiffFailed)?;
            build_change_set(scope, &[&staged], None, None)?
        }
        DiffScope::Working => {
            let head_tree = resolve_head_tree(repo)?;
            let staged = repo
                .diff_tree_to_index(head_tree.as_ref(), None, None)
                .map_err(GitError::DiffFailed)?;

            let mut opts = DiffOptions::new();
            opts.include_untracked(true)
                .recurse_untracked_dirs(true)
                .show_untracked_content(true);
            let unstaged = repo
                .diff_index_to_workdir(None, Some(&mut opts))
                .map_err(GitError::DiffFailed)?;

            build_change_set(scope, &[&staged, &unstaged], None, None)?
        }
        DiffScope::BranchDiff | DiffScope::Pr => collect_branch_diff(repo, scope, base_override)?,
    };

    debug!(
        scope = %change_set.scope,
        files = change_set.changed_files.len(),
        chars = change_set.diff_text.len(),
        additions = change_set.additions,
        deletions = change_set.deletions,
        "collected diff"
    );

    Ok(change_set)
}

/// Diff the current branch tip against its base.
///
/// The old side is the merge base of base and HEAD when one exists, so commits
/// that landed on the base after the branch point do not show up as reverted.
fn collect_branch_diff(
    repo: &Repository,
    scope: DiffScope,
    base_override: Option<&str>,
) -> Result<ChangeSet, GitError> {
    let base = resolve_base(repo, base_override)?;
    let head_commit = repo
        .head()
        .and_then(|h| h.peel_to_commit())
        .map_err(|e| GitError::ReferenceNotFound("HEAD".to_string(), e))?;

    let old_oid = match repo.merge_base(base.oid, head_commit.id()) {
        Ok(oid) => oid,
        Err(e) => {
            debug!(base = %base.name, "no merge base ({e}), diffing against base tip");
            base.oid
        }
    };

    let old_tree = repo
        .find_commit(old_oid)
        .and_then(|c| c.tree())
        .map_err(GitError::DiffFailed)?;
    let new_tree = head_commit.tree().map_err(GitError::DiffFailed)?;

    let diff = repo
        .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), None)
        .map_err(GitError::DiffFailed)?;

    let head_ref = current_branch(repo)?.unwrap_or_else(|| "HEAD".to_string());

    build_change_set(scope, &[&diff], Some(base.name), Some(head_ref))
}

/// Merge one or more diffs into a single [`ChangeSet`].
///
/// Collects changed files from every diff, deduplicates by path (earlier diffs
/// take precedence), and assembles the unified diff text with line counts.
fn build_change_set(
    scope: DiffScope,
    diffs: &[&Diff<'_>],
    base_ref: Option<String>,
    head_ref: Option<String>,
) -> Result<ChangeSet, GitError> {
    let mut changed_files = Vec::new();
    for diff in diffs {
        collect_files_from_diff(diff, &mut changed_files);
    }

    // Stable sort keeps the earlier diff's entry first for dedup.
    changed_files.sort_by(|a, b| a.path.cmp(&b.path));
    changed_files.dedup_by(|a, b| a.path == b.path);

    let mut diff_text = String::new();
    let mut additions = 0usize;
    let mut deletions = 0usize;

    for diff in diffs {
        append_diff_text(diff, &mut diff_text, &mut additions, &mut deletions)?;
    }

    Ok(ChangeSet {
        scope,
        diff_text,
        changed_files,
        base_ref,
        head_ref,
        additions,
        deletions,
    })
}

/// Collect changed file entries from a diff.
fn collect_files_from_diff(diff: &Diff<'_>, files: &mut Vec<ChangedFile>) {
    for delta in diff.deltas() {
        let status = match delta.status() {
            Delta::Added | Delta::Untracked => FileStatus::Added,
            Delta::Deleted => FileStatus::Deleted,
            Delta::Renamed => FileStatus::Renamed,
            _ => FileStatus::Modified,
        };

        let new_path = delta
            .new_file()
            .path()
            .map(|p| p.to_string_lossy().to_string());
        let old_path = delta
            .old_file()
            .path()
            .map(|p| p.to_string_lossy().to_string());

        let (path, old_path) = match status {
            FileStatus::Renamed => {
                let path = new_path
                    .clone()
                    .or_else(|| old_path.clone())
                    .unwrap_or_default();
                (path, old_path)
            }
            _ => (new_path.or(old_path).unwrap_or_default(), None),
        };

        if !path.is_empty() {
            files.push(ChangedFile {
                path,
                status,
                old_path,
            });
        }
    }
}

/// Append unified diff text from a diff object.
///
/// Size limits are applied later by the prompt builder, which knows how much
/// room the instructions leave.
fn append_diff_text(
    diff: &Diff<'_>,
    text: &mut String,
    additions: &mut usize,
    deletions: &mut usize,
) -> Result<(), GitError> {
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        match origin {
            '+' => *additions += 1,
            '-' => *deletions += 1,
            _ => {}
        }

        // Include the origin character for content lines
        if origin == '+' || origin == '-' || origin == ' ' {
            text.push(origin);
        }
        text.push_str(&String::from_utf8_lossy(line.content()));

        true
    })
    .map_err(GitError::DiffFailed)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use git2::Signature;

    use super::*;

    fn init_with_commit() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let sig = Signature::now("Test", "test@test.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        (dir, repo)
    }

    fn stage(repo: &Repository, path: &str) {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(path)).unwrap();
        index.write().unwrap();
    }

    #[test]
    fn test_file_status_names() {
        assert_eq!(FileStatus::Added.to_string(), "added");
        assert_eq!(FileStatus::Renamed.to_string(), "renamed");
    }

    #[test]
    fn test_scope_names() {
        assert_eq!(DiffScope::Staged.to_string(), "staged");
        assert_eq!(DiffScope::BranchDiff.to_string(), "branch-diff");
        assert_eq!(DiffScope::Pr.to_string(), "pr");
        assert_eq!(DiffScope::Working.to_string(), "working");
    }

    #[test]
    fn test_staged_on_clean_repo_is_empty_not_error() {
        let (_dir, repo) = init_with_commit();

        let change_set = collect(&repo, DiffScope::Staged, None).unwrap();
        assert!(change_set.is_empty());
        assert!(change_set.changed_files.is_empty());
        assert!(change_set.base_ref.is_none());
    }

    #[test]
    fn test_staged_ignores_unstaged_files() {
        let (dir, repo) = init_with_commit();
        std::fs::write(dir.path().join("untracked.txt"), "not staged\n").unwrap();

        let change_set = collect(&repo, DiffScope::Staged, None).unwrap();
        assert!(change_set.is_empty());
    }

    #[test]
    fn test_staged_detects_new_file() {
        let (dir, repo) = init_with_commit();
        std::fs::write(dir.path().join("new.txt"), "hello world\n").unwrap();
        stage(&repo, "new.txt");

        let change_set = collect(&repo, DiffScope::Staged, None).unwrap();
        assert!(!change_set.is_empty());
        assert_eq!(change_set.changed_files.len(), 1);
        assert_eq!(change_set.changed_files[0].path, "new.txt");
        assert_eq!(change_set.changed_files[0].status, FileStatus::Added);
        assert!(change_set.diff_text.contains("+hello world"));
        assert_eq!(change_set.additions, 1);
        assert_eq!(change_set.deletions, 0);
    }

    #[test]
    fn test_staged_in_unborn_repo() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        std::fs::write(dir.path().join("first.txt"), "first file\n").unwrap();
        stage(&repo, "first.txt");

        let change_set = collect(&repo, DiffScope::Staged, None).unwrap();
        assert!(change_set.changed_files.iter().any(|f| f.path == "first.txt"));
    }

    #[test]
    fn test_working_includes_untracked_and_staged() {
        let (dir, repo) = init_with_commit();
        std::fs::write(dir.path().join("staged.txt"), "staged content\n").unwrap();
        stage(&repo, "staged.txt");
        std::fs::write(dir.path().join("loose.txt"), "loose content\n").unwrap();

        let change_set = collect(&repo, DiffScope::Working, None).unwrap();
        let paths: Vec<&str> = change_set
            .changed_files
            .iter()
            .map(|f| f.path.as_str())
            .collect();
        assert!(paths.contains(&"staged.txt"));
        assert!(paths.contains(&"loose.txt"));
        assert!(change_set.diff_text.contains("+loose content"));
    }

    #[test]
    fn test_staged_modification_counts_lines() {
        let (dir, repo) = init_with_commit();
        let file_path = dir.path().join("file.txt");
        std::fs::write(&file_path, "original\n").unwrap();
        stage(&repo, "file.txt");
        {
            let mut index = repo.index().unwrap();
            let tree_id = index.write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            let sig = Signature::now("Test", "test@test.com").unwrap();
            let parent = repo.head().unwrap().peel_to_commit().unwrap();
            repo.commit(Some("HEAD"), &sig, &sig, "add file", &tree, &[&parent])
                .unwrap();
        }

        std::fs::write(&file_path, "modified\n").unwrap();
        stage(&repo, "file.txt");

        let change_set = collect(&repo, DiffScope::Staged, None).unwrap();
        assert_eq!(change_set.changed_files[0].status, FileStatus::Modified);
        assert!(change_set.diff_text.contains("-original"));
        assert!(change_set.diff_text.contains("+modified"));
        assert_eq!(change_set.additions, 1);
        assert_eq!(change_set.deletions, 1);
    }

    #[test]
    fn test_branch_diff_without_base_fails() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        {
            let sig = Signature::now("Test", "test@test.com").unwrap();
            let tree_id = repo.index().unwrap().write_tree().unwrap();
            let tree = repo.find_tree(tree_id).unwrap();
            repo.commit(Some("refs/heads/trunk"), &sig, &sig, "init", &tree, &[])
                .unwrap();
        }
        repo.set_head("refs/heads/trunk").unwrap();

        let result = collect(&repo, DiffScope::BranchDiff, None);
        assert!(matches!(result, Err(GitError::NoBaseBranch)));
    }

    #[test]
    fn test_corrupt_head_propagates_error() {
        let (dir, _repo) = init_with_commit();
        std::fs::write(dir.path().join(".git/HEAD"), "ref: refs/heads/\0invalid").unwrap();

        let repo = Repository::open(dir.path()).unwrap();
        let result = collect(&repo, DiffScope::Staged, None);
        assert!(
            matches!(result, Err(GitError::DiffFailed(_))),
            "Expected DiffFailed for corrupt HEAD, got: {:?}",
            result
        );
    }

    #[test]
    fn test_tiny_diff_counts_as_empty() {
        let change_set = ChangeSet {
            scope: DiffScope::Staged,
            diff_text: "  +x \n".to_string(),
            changed_files: Vec::new(),
            base_ref: None,
            head_ref: None,
            additions: 1,
            deletions: 0,
        };
        assert!(change_set.is_empty());
    }
}
