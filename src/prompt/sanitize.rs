//! Diff text cleanup applied before embedding in a prompt.

use regex_lite::Regex;
use std::sync::LazyLock;

/// CSI sequences (`ESC [ ... final`) and two-byte escapes.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]|\x1b[@-Z\\-_]").expect("Invalid ANSI escape regex")
});

/// Phrases that try to override the instructions, matched case-insensitively.
static INJECTION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(ignore\s+(all\s+)?(the\s+)?(previous|prior|above)\s+instructions|disregard\s+(all\s+)?(the\s+)?(previous|prior|above)\s+instructions|forget\s+(all\s+)?(your\s+|the\s+)?(previous\s+|prior\s+)?instructions|you\s+are\s+now\s+|new\s+instructions\s*:|system\s+prompt\s*:)",
    )
    .expect("Invalid injection regex")
});

const INJECTION_REPLACEMENT: &str = "[filtered]";

/// Remove control characters except newlines and tabs.
pub fn remove_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t' || *c == '\x1b')
        .collect()
}

/// Remove ANSI escape sequences, then any stray escape characters.
pub fn remove_ansi_escapes(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").replace('\x1b', "")
}

/// Neutralize known prompt-injection phrases.
pub fn filter_injection_patterns(text: &str) -> String {
    INJECTION_PATTERN
        .replace_all(text, INJECTION_REPLACEMENT)
        .into_owned()
}

/// Collapse runs of more than two blank lines into two.
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() && line.ends_with('\n') {
            blank_run += 1;
            if blank_run > 2 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        result.push_str(line);
    }

    result
}

/// Sanitize diff text for inclusion in a prompt.
///
/// Unlike free-form text, diffs keep their full line count and Markdown
/// headers; size limits are the prompt builder's job.
pub fn sanitize_diff(text: &str) -> String {
    // Escapes must survive control-char removal so the ANSI pass can match
    // the whole sequence.
    let result = remove_control_chars(text);
    let result = remove_ansi_escapes(&result);
    let result = filter_injection_patterns(&result);
    normalize_whitespace(&result)
}
