//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use git2::{Oid, Repository, RepositoryInitOptions, Signature};

use diffscribe::llm::RetryPolicy;
use diffscribe::{BackendError, CompletionClient, Pipeline, PromptBuilder, TextCompletionService};

/// A test git repository builder for integration tests.
///
/// The initial branch is always `main`, regardless of the host's git config.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).expect("Failed to init git repo");
        Self { dir, repo }
    }

    /// Repository with one commit on `main` containing `README.md`.
    pub fn with_initial_commit() -> Self {
        let test_repo = Self::new();
        test_repo.write("README.md", "# Project\n\nA small test project.\n");
        test_repo.stage("README.md");
        test_repo.commit("chore: initial commit");
        test_repo
    }

    fn signature(&self) -> Signature<'_> {
        Signature::now("Test User", "test@example.com").expect("Failed to create signature")
    }

    /// Write a file relative to the work tree, creating parent directories.
    pub fn write(&self, path: &str, content: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(full, content).expect("Failed to write test file");
    }

    /// Add a path to the index.
    pub fn stage(&self, path: &str) {
        let mut index = self.repo.index().expect("Failed to get index");
        index.add_path(Path::new(path)).expect("Failed to add file");
        index.write().expect("Failed to write index");
    }

    /// Commit the current index on HEAD. Returns the commit OID.
    pub fn commit(&self, message: &str) -> Oid {
        let sig = self.signature();
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Write, stage and commit a single file.
    pub fn commit_file(&self, path: &str, content: &str, message: &str) -> Oid {
        self.write(path, content);
        self.stage(path);
        self.commit(message)
    }

    /// Create a branch at HEAD.
    pub fn branch(&self, name: &str) {
        let head = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .expect("Failed to resolve HEAD");
        self.repo.branch(name, &head, false).expect("Failed to create branch");
    }

    /// Point HEAD at a local branch and update the work tree.
    pub fn checkout(&self, name: &str) {
        self.repo
            .set_head(&format!("refs/heads/{name}"))
            .expect("Failed to set HEAD");
        self.repo
            .checkout_head(Some(git2::build::CheckoutBuilder::new().force()))
            .expect("Failed to check out HEAD");
    }
}

/// A backend that replays a fixed reply and counts calls.
pub struct ScriptedService {
    reply: Result<Vec<String>, BackendError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedService {
    pub fn replying(texts: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(texts.iter().map(|t| t.to_string()).collect()),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing(error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            delay: None,
            calls: AtomicUsize::new(0),
        })
    }

    /// Replies only after `delay`.
    pub fn slow(texts: &[&str], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(texts.iter().map(|t| t.to_string()).collect()),
            delay: Some(delay),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextCompletionService for ScriptedService {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn max_candidates_per_request(&self) -> usize {
        8
    }

    async fn send_prompt(
        &self,
        _prompt: &str,
        _candidate_count: usize,
    ) -> Result<Vec<String>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

/// Pipeline over `service` with no retries and a long timeout.
pub fn pipeline_with(service: Arc<ScriptedService>) -> Pipeline {
    let client = CompletionClient::new(service)
        .with_request_timeout(Duration::from_secs(300))
        .with_retry_policy(RetryPolicy::default().with_max_retries(0));
    Pipeline::new(PromptBuilder::default(), client, 5)
}
