//! Exponential backoff retry for completion requests.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tracing::warn;

/// Retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;
const INITIAL_INTERVAL_SECS: u64 = 1;
const MAX_INTERVAL_SECS: u64 = 30;

/// How often and how patiently to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_interval: Duration,
    pub max_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_interval: Duration::from_secs(INITIAL_INTERVAL_SECS),
            max_interval: Duration::from_secs(MAX_INTERVAL_SECS),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.initial_interval,
            max_interval: self.max_interval,
            max_elapsed_time: None,
            ..Default::default()
        }
    }
}

/// Retry an async operation with exponential backoff.
///
/// `attempt` runs up to `policy.max_attempts()` times. An error for which
/// `is_retryable` returns false is returned immediately; otherwise the task
/// sleeps for an exponentially increasing duration before the next attempt and
/// the last error is returned once attempts run out.
pub async fn retry_with_backoff<T, E, Fut, F, R>(
    policy: &RetryPolicy,
    mut attempt: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let mut backoff = policy.backoff();
    let max_attempts = policy.max_attempts();
    let mut attempts = 0;

    loop {
        attempts += 1;

        let err = match attempt().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if attempts >= max_attempts || !is_retryable(&err) {
            return Err(err);
        }

        match backoff.next_backoff() {
            Some(wait_duration) => {
                warn!(
                    attempt = attempts,
                    max_attempts,
                    wait_ms = wait_duration.as_millis() as u64,
                    "request failed, retrying: {err}"
                );
                tokio::time::sleep(wait_duration).await;
            }
            None => return Err(err),
        }
    }
}
