//! Prompt construction: diff sanitizing, PR templates and size-bounded prompts.

pub mod builder;
pub mod sanitize;
pub mod template;

pub use builder::{PromptBuilder, PromptSpec, TRUNCATION_MARKER};
pub use sanitize::sanitize_diff;
pub use template::{DEFAULT_PR_TEMPLATE, Template};
