//! PR summary candidates.

use crate::prompt::template::{extract_headers, normalize_header, parse_header};

use super::rules::Verdict;

/// Drop a code fence wrapping the whole response.
fn strip_outer_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(newline) = rest.find('\n') else {
        return trimmed;
    };
    let inner = &rest[newline + 1..];
    match inner.trim_end().strip_suffix("```") {
        Some(body) => body.trim(),
        None => trimmed,
    }
}

fn has_header(lines: &[&str], normalized: &str) -> bool {
    lines
        .iter()
        .any(|line| parse_header(line).is_some_and(|h| normalize_header(&h) == normalized))
}

/// Body of the first fenced block containing the `first` header.
///
/// A fence line with an info string inside the block opens a nested block; a
/// bare fence closes the innermost one. An unterminated block runs to the end.
fn fenced_summary(text: &str, first: &str) -> Option<String> {
    let mut body: Option<Vec<&str>> = None;
    let mut depth = 0usize;

    for line in text.lines() {
        let fence = line.trim_start().strip_prefix("```").map(str::trim);
        let Some(lines) = body.as_mut() else {
            if fence.is_some() {
                body = Some(Vec::new());
                depth = 0;
            }
            continue;
        };

        match fence {
            Some("") if depth == 0 => {
                if has_header(lines, first) {
                    return Some(lines.join("\n").trim().to_string());
                }
                body = None;
            }
            Some("") => {
                depth -= 1;
                lines.push(line);
            }
            Some(_) => {
                depth += 1;
                lines.push(line);
            }
            None => lines.push(line),
        }
    }

    body.filter(|lines| has_header(lines, first))
        .map(|lines| lines.join("\n").trim().to_string())
}

/// Split a response into summaries at each recurrence of the template's first
/// header. Text before the first occurrence is dropped. When the summary sits
/// in a code fence, only that fence's body is read.
pub fn segment(text: &str, headers: &[String]) -> Vec<String> {
    let Some(first) = headers.first().map(|h| normalize_header(h)) else {
        return vec![strip_outer_fence(text).to_string()];
    };
    let fenced = fenced_summary(text, &first);
    let text = fenced.as_deref().unwrap_or_else(|| strip_outer_fence(text));

    let mut summaries: Vec<Vec<&str>> = Vec::new();
    let mut in_fence = false;
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let starts_summary = !in_fence
            && parse_header(line).is_some_and(|header| normalize_header(&header) == first);
        if starts_summary {
            summaries.push(vec![line]);
        } else if let Some(current) = summaries.last_mut() {
            current.push(line);
        }
    }

    if summaries.is_empty() {
        return vec![text.to_string()];
    }
    summaries
        .into_iter()
        .map(|lines| lines.join("\n").trim().to_string())
        .collect()
}

/// Require every template header, in template order. Missing sections are
/// reported, never filled in.
pub fn validate(candidate: &str, headers: &[String]) -> Verdict {
    let content = candidate.trim();
    if content.is_empty() {
        return Verdict::Reject("empty summary".to_string());
    }

    let found: Vec<String> = extract_headers(content)
        .iter()
        .map(|h| normalize_header(h))
        .collect();

    let mut position = 0;
    for header in headers {
        let wanted = normalize_header(header);
        match found[position..].iter().position(|h| *h == wanted) {
            Some(offset) => position += offset + 1,
            None if found.contains(&wanted) => {
                return Verdict::Reject(format!("section '{header}' is out of template order"));
            }
            None => return Verdict::Reject(format!("missing section '{header}'")),
        }
    }

    Verdict::Accept {
        content: content.to_string(),
        demoted: false,
    }
}
