//! Branch lookup: current branch, default-branch detection, base resolution.

use git2::{BranchType, ErrorCode, Oid, Repository};
use tracing::debug;

use crate::error::GitError;

/// Default-branch candidates, in detection order. Remote-tracking names use
/// the `remote/branch` shorthand.
const BASE_CANDIDATES: [(&str, BranchType); 4] = [
    ("main", BranchType::Local),
    ("master", BranchType::Local),
    ("origin/main", BranchType::Remote),
    ("origin/master", BranchType::Remote),
];

/// Branch names treated as "the default branch" when deciding whether the
/// user is working directly on it.
const DEFAULT_BRANCH_NAMES: [&str; 2] = ["main", "master"];

/// A resolved comparison base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseRef {
    pub name: String,
    pub oid: Oid,
}

/// Name of the checked-out branch.
///
/// Returns `Ok(None)` for a detached HEAD. For a repository without commits the
/// branch HEAD will create is returned, matching `git branch --show-current`.
pub fn current_branch(repo: &Repository) -> Result<Option<String>, GitError> {
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
        Ok(_) => Ok(None),
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            let head = repo
                .find_reference("HEAD")
                .map_err(|e| GitError::ReferenceNotFound("HEAD".to_string(), e))?;
            Ok(head
                .symbolic_target()
                .map(|t| t.strip_prefix("refs/heads/").unwrap_or(t).to_string()))
        }
        Err(e) => Err(GitError::ReferenceNotFound("HEAD".to_string(), e)),
    }
}

/// Whether the checked-out branch is `main` or `master`.
pub fn is_on_default_branch(repo: &Repository) -> Result<bool, GitError> {
    Ok(current_branch(repo)?
        .is_some_and(|name| DEFAULT_BRANCH_NAMES.contains(&name.as_str())))
}

/// Detect the repository's default branch.
///
/// Tries `main`, `master`, `origin/main`, `origin/master` in that order and
/// fails with [`GitError::NoBaseBranch`] when none exists.
pub fn default_branch(repo: &Repository) -> Result<BaseRef, GitError> {
    for (name, branch_type) in BASE_CANDIDATES {
        let branch = match repo.find_branch(name, branch_type) {
            Ok(branch) => branch,
            Err(e) if e.code() == ErrorCode::NotFound => continue,
            Err(e) => return Err(GitError::ReferenceNotFound(name.to_string(), e)),
        };

        let commit = branch
            .get()
            .peel_to_commit()
            .map_err(|e| GitError::ReferenceNotFound(name.to_string(), e))?;

        debug!(base = name, "detected default branch");
        return Ok(BaseRef {
            name: name.to_string(),
            oid: commit.id(),
        });
    }

    Err(GitError::NoBaseBranch)
}

/// Resolve the comparison base: an explicit ref when given, otherwise the
/// detected default branch.
pub fn resolve_base(repo: &Repository, base_override: Option<&str>) -> Result<BaseRef, GitError> {
    let Some(reference) = base_override else {
        return default_branch(repo);
    };

    let commit = repo
        .revparse_single(reference)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|e| GitError::ReferenceNotFound(reference.to_string(), e))?;

    Ok(BaseRef {
        name: reference.to_string(),
        oid: commit.id(),
    })
}

/// Local branch names followed by remote-tracking branch names.
pub fn list_branches(repo: &Repository) -> Result<Vec<String>, GitError> {
    let mut names = Vec::new();
    for branch_type in [BranchType::Local, BranchType::Remote] {
        let branches = repo
            .branches(Some(branch_type))
            .map_err(GitError::StatusFailed)?;
        for entry in branches {
            let (branch, _) = entry.map_err(GitError::StatusFailed)?;
            if let Some(name) = branch.name().map_err(GitError::StatusFailed)? {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
