//! PR summary templates and their header lists.

use std::path::Path;

use tracing::{debug, warn};

use crate::error::TemplateError;

/// Skeleton used when no `--template` is given.
pub const DEFAULT_PR_TEMPLATE: &str = "## Summary
[Brief description of changes]

## Changes Made
- [Change 1]
- [Change 2]
- [Change 3]

## Testing
- [ ] Unit tests
- [ ] Integration tests
- [ ] Manual testing

## Checklist
- [ ] Code review completed
- [ ] Documentation updated
- [ ] Tests added/updated
";

/// A Markdown template for PR summaries.
///
/// The ATX headers are the authoritative section list: a PR summary must
/// contain every one of them, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    headers: Vec<String>,
}

impl Template {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let headers = extract_headers(&raw);
        if headers.is_empty() {
            warn!("PR template has no Markdown headers; summaries will not be checked for sections");
        }
        Self { raw, headers }
    }

    pub fn from_file(path: &Path) -> Result<Self, TemplateError> {
        let raw = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded PR template");
        Ok(Self::parse(raw))
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Header lines as written, without trailing closing hashes.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

impl Default for Template {
    fn default() -> Self {
        Self::parse(DEFAULT_PR_TEMPLATE)
    }
}

/// Parse an ATX header line (`#` to `######` followed by a space).
///
/// Returns the header with closing hashes and trailing whitespace removed.
pub fn parse_header(line: &str) -> Option<String> {
    let trimmed = line.trim_end();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes == 0 || hashes > 6 {
        return None;
    }

    let rest = &trimmed[hashes..];
    if !rest.starts_with(' ') && !rest.starts_with('\t') {
        return None;
    }

    let text = rest.trim().trim_end_matches('#').trim_end();
    if text.is_empty() {
        return None;
    }

    Some(format!("{} {}", &trimmed[..hashes], text))
}

/// Header lines outside fenced code blocks, in document order.
pub fn extract_headers(markdown: &str) -> Vec<String> {
    let mut in_fence = false;
    let mut headers = Vec::new();

    for line in markdown.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if let Some(header) = parse_header(line) {
            headers.push(header);
        }
    }

    headers
}

/// Comparison key for headers: lowercase, inner whitespace collapsed.
pub fn normalize_header(header: &str) -> String {
    header
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_headers() {
        let template = Template::default();
        assert_eq!(
            template.headers(),
            ["## Summary", "## Changes Made", "## Testing", "## Checklist"]
        );
        assert_eq!(template.raw(), DEFAULT_PR_TEMPLATE);
    }

    #[test]
    fn test_header_levels() {
        assert_eq!(parse_header("# Title").as_deref(), Some("# Title"));
        assert_eq!(parse_header("###### Deep").as_deref(), Some("###### Deep"));
        assert_eq!(parse_header("####### Too deep"), None);
        assert_eq!(parse_header("#hashtag"), None);
        assert_eq!(parse_header("##"), None);
        assert_eq!(parse_header("   ## Indented"), None);
    }

    #[test]
    fn test_closing_hashes_stripped() {
        assert_eq!(parse_header("## Notes ##").as_deref(), Some("## Notes"));
    }

    #[test]
    fn test_headers_in_code_fences_ignored() {
        let md = "## Summary\n```bash\n# not a header\n```\n## Testing\n";
        assert_eq!(extract_headers(md), ["## Summary", "## Testing"]);
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("##   Changes  Made "), "## changes made");
    }

    #[test]
    fn test_headerless_template_accepted() {
        let template = Template::parse("Just write something nice.");
        assert!(template.headers().is_empty());
    }

    #[test]
    fn test_from_file_missing() {
        let result = Template::from_file(Path::new("/nonexistent/template.md"));
        assert!(matches!(result, Err(TemplateError::Read { .. })));
    }

    #[test]
    fn test_from_file_reads_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pr.md");
        std::fs::write(&path, "## What\n\n## Why\n").unwrap();

        let template = Template::from_file(&path).unwrap();
        assert_eq!(template.headers(), ["## What", "## Why"]);
    }
}
