//! Git operations using git2-rs.

pub mod branch;
pub mod diff;
pub mod inspect;

use std::path::Path;

use git2::Repository;

use crate::error::GitError;

pub use branch::{BaseRef, current_branch, default_branch, is_on_default_branch, resolve_base};
pub use diff::{ChangeSet, ChangedFile, DiffScope, FileStatus, collect};
pub use inspect::{RepoReport, inspect};

/// Open the repository containing `path`, searching parent directories.
pub fn open_repository(path: impl AsRef<Path>) -> Result<Repository, GitError> {
    Repository::discover(path).map_err(GitError::NotARepository)
}
