//! Completion client: timeouts, retries and concurrent fan-out.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::{BackendError, BackendErrorKind};
use crate::prompt::PromptSpec;

use super::retry::{RetryPolicy, retry_with_backoff};
use super::service::{CompletionResult, TextCompletionService};

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of completions requested per invocation.
pub const DEFAULT_COMPLETIONS: usize = 1;

/// Sends prompts to a [`TextCompletionService`].
#[derive(Clone)]
pub struct CompletionClient {
    service: Arc<dyn TextCompletionService>,
    candidate_count: usize,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("service", &self.service.name())
            .field("candidate_count", &self.candidate_count)
            .field("request_timeout", &self.request_timeout)
            .field("retry", &self.retry)
            .finish()
    }
}

impl CompletionClient {
    pub fn new(service: Arc<dyn TextCompletionService>) -> Self {
        Self {
            service,
            candidate_count: DEFAULT_COMPLETIONS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }

    /// Number of completions to request per invocation.
    pub fn with_candidate_count(mut self, candidate_count: usize) -> Self {
        self.candidate_count = candidate_count.max(1);
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Send the prompt and collect completions.
    ///
    /// One request when the backend can return `candidate_count` completions at
    /// once, otherwise independent concurrent requests merged in request order.
    /// Failed requests are left out of the merge; the result fails only when
    /// every request failed.
    pub async fn complete(&self, prompt: &PromptSpec) -> CompletionResult {
        let text: Arc<str> = Arc::from(prompt.text());
        let per_request = self.service.max_candidates_per_request().max(1);

        if per_request >= self.candidate_count {
            return match self.request(&text, self.candidate_count).await {
                Ok(texts) => CompletionResult::success(texts),
                Err(e) => CompletionResult::failure(e),
            };
        }

        let requests = self.candidate_count.div_ceil(per_request);
        debug!(
            backend = self.service.name(),
            requests, per_request, "fanning out completion requests"
        );

        let mut tasks = JoinSet::new();
        for index in 0..requests {
            let client = self.clone();
            let text = Arc::clone(&text);
            let count = per_request.min(self.candidate_count - index * per_request);
            tasks.spawn(async move { (index, client.request(&text, count).await) });
        }

        let mut outcomes: Vec<(usize, Result<Vec<String>, BackendError>)> = Vec::with_capacity(requests);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => warn!("completion task failed: {e}"),
            }
        }
        outcomes.sort_by_key(|(index, _)| *index);

        let mut texts = Vec::new();
        let mut first_error = None;
        for (index, outcome) in outcomes {
            match outcome {
                Ok(batch) => texts.extend(batch),
                Err(e) => {
                    warn!(request = index, "completion request excluded: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        if texts.is_empty() {
            let error = first_error.unwrap_or_else(|| {
                BackendError::new(BackendErrorKind::Unavailable, "all completion tasks failed")
            });
            return CompletionResult::failure(error);
        }
        CompletionResult::success(texts)
    }

    /// One logical request: timeout per attempt, retries for transient kinds.
    async fn request(&self, prompt: &str, count: usize) -> Result<Vec<String>, BackendError> {
        let timeout_secs = self.request_timeout.as_secs();
        retry_with_backoff(
            &self.retry,
            || async {
                match tokio::time::timeout(self.request_timeout, self.service.send_prompt(prompt, count)).await {
                    Ok(Ok(texts)) if texts.is_empty() => Err(BackendError::new(
                        BackendErrorKind::Malformed,
                        "backend returned no completions",
                    )),
                    Ok(result) => result,
                    Err(_) => Err(BackendError::new(
                        BackendErrorKind::Timeout,
                        format!("no response within {timeout_secs}s"),
                    )),
                }
            },
            BackendError::is_transient,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::service::MockTextCompletionService;
    use crate::suggest::SuggestionKind;

    fn spec() -> PromptSpec {
        PromptSpec {
            kind: SuggestionKind::Commit,
            instructions: "Suggest commit messages.\n".to_string(),
            body: "+fn x() {}\n".to_string(),
            max_length: 1000,
            truncated: false,
        }
    }

    fn err(kind: BackendErrorKind) -> BackendError {
        BackendError::new(kind, "test")
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_twice_then_success() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(8usize);

        let mut seq = mockall::Sequence::new();
        mock.expect_send_prompt()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(err(BackendErrorKind::RateLimited)));
        mock.expect_send_prompt()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(vec!["third".to_string()]));

        let client = CompletionClient::new(Arc::new(mock));
        let result = client.complete(&spec()).await;

        assert!(result.succeeded());
        assert_eq!(result.texts, ["third"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_every_attempt() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(8usize);
        mock.expect_send_prompt()
            .times(3)
            .returning(|_, _| Err(err(BackendErrorKind::RateLimited)));

        let result = CompletionClient::new(Arc::new(mock)).complete(&spec()).await;

        assert!(!result.succeeded());
        assert_eq!(result.error_kind(), Some(BackendErrorKind::RateLimited));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_not_retried() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(8usize);
        mock.expect_send_prompt()
            .times(1)
            .returning(|_, _| Err(err(BackendErrorKind::AuthFailure)));

        let result = CompletionClient::new(Arc::new(mock)).complete(&spec()).await;
        assert_eq!(result.error_kind(), Some(BackendErrorKind::AuthFailure));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_request_uses_backend_count() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(8usize);
        mock.expect_send_prompt()
            .withf(|prompt, count| *count == 3 && prompt.starts_with("Suggest commit messages."))
            .times(1)
            .returning(|_, _| Ok(vec!["a".into(), "b".into(), "c".into()]));

        let client = CompletionClient::new(Arc::new(mock)).with_candidate_count(3);
        let result = client.complete(&spec()).await;
        assert_eq!(result.texts, ["a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_merges_in_request_order() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(1usize);
        mock.expect_send_prompt()
            .withf(|_, count| *count == 1)
            .times(3)
            .returning(|_, _| Ok(vec!["same".to_string()]));

        let client = CompletionClient::new(Arc::new(mock)).with_candidate_count(3);
        let result = client.complete(&spec()).await;
        assert!(result.succeeded());
        assert_eq!(result.texts.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fan_out_all_failed_reports_error() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(1usize);
        mock.expect_send_prompt()
            .returning(|_, _| Err(err(BackendErrorKind::Malformed)));

        let client = CompletionClient::new(Arc::new(mock)).with_candidate_count(2);
        let result = client.complete(&spec()).await;
        assert_eq!(result.error_kind(), Some(BackendErrorKind::Malformed));
    }

    /// First call hangs past any timeout; later calls answer immediately.
    struct StallingService {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl TextCompletionService for StallingService {
        fn name(&self) -> &'static str {
            "stalling"
        }

        fn max_candidates_per_request(&self) -> usize {
            1
        }

        async fn send_prompt(&self, _prompt: &str, _count: usize) -> Result<Vec<String>, BackendError> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call == 0 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok(vec![format!("answer {call}")])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_request_excluded_from_merge() {
        let service = StallingService {
            calls: std::sync::atomic::AtomicUsize::new(0),
        };
        let client = CompletionClient::new(Arc::new(service))
            .with_candidate_count(3)
            .with_request_timeout(Duration::from_secs(5))
            .with_retry_policy(RetryPolicy::default().with_max_retries(0));

        let result = client.complete(&spec()).await;
        assert!(result.succeeded());
        assert_eq!(result.texts.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_after_retries() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(8usize);
        mock.expect_send_prompt()
            .times(3)
            .returning(|_, _| Err(err(BackendErrorKind::Timeout)));

        let result = CompletionClient::new(Arc::new(mock)).complete(&spec()).await;
        assert_eq!(result.error_kind(), Some(BackendErrorKind::Timeout));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_completion_list_is_malformed() {
        let mut mock = MockTextCompletionService::new();
        mock.expect_name().return_const("mock");
        mock.expect_max_candidates_per_request().return_const(8usize);
        mock.expect_send_prompt().times(1).returning(|_, _| Ok(Vec::new()));

        let result = CompletionClient::new(Arc::new(mock)).complete(&spec()).await;
        assert_eq!(result.error_kind(), Some(BackendErrorKind::Malformed));
    }
}
