//! Tolerant splitting of free-form backend text into candidate items.
//!
//! Backends wrap answers in code fences, bold markers and list numbering in
//! every combination; these helpers undo that before validation.

use regex_lite::Regex;
use std::sync::LazyLock;

/// `1.`, `2)`, `10.` followed by whitespace.
static NUMBERED_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d{1,2}[.)]\s+").expect("Invalid numbered marker regex"));

/// `-`, `*`, `+` or `•` followed by whitespace.
static BULLET_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+•]\s+").expect("Invalid bullet marker regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Numbered,
    Bullet,
}

/// Remove code fence lines, keeping the fenced content.
pub fn strip_fences(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove emphasis asterisks and inline-code backticks.
pub fn strip_inline_markup(text: &str) -> String {
    text.chars().filter(|c| *c != '*' && *c != '`').collect()
}

/// Remove bold markers only, keeping single asterisks that may be list bullets.
pub fn strip_bold(text: &str) -> String {
    text.replace("**", "").replace("__", "")
}

fn marker_len(re: &Regex, line: &str) -> Option<usize> {
    re.find(line).map(|m| m.end())
}

fn classify(line: &str) -> Option<(Marker, usize)> {
    let line = strip_bold(line);
    // Bold wrapping a number ("**1.** feat: ...") only hides the marker.
    if let Some(end) = marker_len(&NUMBERED_MARKER, &line) {
        return Some((Marker::Numbered, end));
    }
    marker_len(&BULLET_MARKER, &line).map(|end| (Marker::Bullet, end))
}

/// Split list-formatted text into items.
///
/// Numbered items win over bullets when both are present, so bulleted commit
/// bodies stay attached to their numbered subject. A line continues the current
/// item when it directly follows it or is indented; an unindented line after a
/// blank line ends the item. Text before the first item is dropped.
///
/// Returns `None` when the text has no list markers at all.
pub fn list_items(text: &str) -> Option<Vec<String>> {
    let lines: Vec<&str> = text.lines().collect();
    let classified: Vec<Option<(Marker, usize)>> = lines.iter().map(|l| classify(l)).collect();

    let marker = if classified.iter().flatten().any(|(m, _)| *m == Marker::Numbered) {
        Marker::Numbered
    } else if classified.iter().flatten().any(|(m, _)| *m == Marker::Bullet) {
        Marker::Bullet
    } else {
        return None;
    };

    let mut items: Vec<Vec<String>> = Vec::new();
    let mut open = false;
    let mut after_blank = false;

    for (line, class) in lines.iter().zip(&classified) {
        match class {
            Some((m, end)) if *m == marker => {
                let stripped = strip_bold(line);
                items.push(vec![stripped[*end..].trim().to_string()]);
                open = true;
                after_blank = false;
            }
            _ if line.trim().is_empty() => {
                if open {
                    after_blank = true;
                    if let Some(item) = items.last_mut() {
                        item.push(String::new());
                    }
                }
            }
            _ => {
                let indented = line.starts_with(' ') || line.starts_with('\t');
                if open && (!after_blank || indented) {
                    if let Some(item) = items.last_mut() {
                        item.push(line.trim().to_string());
                    }
                    after_blank = false;
                } else {
                    open = false;
                }
            }
        }
    }

    Some(
        items
            .into_iter()
            .map(|lines| lines.join("\n").trim().to_string())
            .filter(|item| !item.is_empty())
            .collect(),
    )
}

/// Split text into blank-line separated blocks.
pub fn blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        blocks.push(current.join("\n"));
    }

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let text = "```\nfeature/add-login\n```";
        assert_eq!(strip_fences(text), "feature/add-login");
    }

    #[test]
    fn test_strip_inline_markup() {
        assert_eq!(strip_inline_markup("**`feat: add x`**"), "feat: add x");
    }

    #[test]
    fn test_numbered_items() {
        let text = "Here are some names:\n\n1. feature/a\n2) fix/b\n3. chore/c";
        assert_eq!(
            list_items(text).unwrap(),
            ["feature/a", "fix/b", "chore/c"]
        );
    }

    #[test]
    fn test_bold_numbering() {
        let text = "**1.** feat: add login\n**2.** fix: handle nil";
        assert_eq!(list_items(text).unwrap(), ["feat: add login", "fix: handle nil"]);
    }

    #[test]
    fn test_numbered_items_keep_indented_body() {
        let text = "1. feat: add login\n\n   Adds the login page.\n   - handles errors\n\n2. fix: typo\n\nThese follow Conventional Commits.";
        let items = list_items(text).unwrap();
        assert_eq!(
            items,
            [
                "feat: add login\n\nAdds the login page.\n- handles errors",
                "fix: typo"
            ]
        );
    }

    #[test]
    fn test_bullet_items() {
        let text = "- feature/a\n* fix/b\n• docs/c";
        assert_eq!(list_items(text).unwrap(), ["feature/a", "fix/b", "docs/c"]);
    }

    #[test]
    fn test_no_markers() {
        assert!(list_items("feature/a\nfix/b").is_none());
    }

    #[test]
    fn test_blocks() {
        let text = "feat: one\n\nbody\n\n\nfix: two\n";
        assert_eq!(blocks(text), ["feat: one", "body", "fix: two"]);
    }
}
