//! Completion backends and the client that drives them.

pub mod claude;
pub mod client;
pub mod openai;
pub mod retry;
pub mod service;

pub use claude::ClaudeCliService;
pub use client::CompletionClient;
pub use openai::OpenAiService;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use service::{CompletionResult, TextCompletionService};
