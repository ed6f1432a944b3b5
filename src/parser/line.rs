// Line-level grammar: task lines, headings, code fences and trailing comments.

/// A line recognized as a task, split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLine<'a> {
    /// Byte offset of the first non-whitespace character.
    pub actual_spaces: usize,
    /// `-`, `*`, `+`, `3.` / `3)`, or empty when the line has no list marker.
    pub list_marker: &'a str,
    pub raw_status: char,
    /// Text after the status token, trimmed.
    pub content: &'a str,
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Length in bytes of a list marker at the start of `s`, including nothing after it.
fn list_marker_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    match bytes.first()? {
        b'-' | b'*' | b'+' => Some(1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            matches!(bytes.get(digits), Some(b'.') | Some(b')')).then_some(digits + 1)
        }
        _ => None,
    }
}

/// Match `[c]` at the start of `s`, followed by whitespace or end of line.
fn status_token(s: &str) -> Option<(char, &str)> {
    let rest = s.strip_prefix('[')?;
    let mut chars = rest.chars();
    let status = chars.next()?;
    let after = chars.as_str().strip_prefix(']')?;
    if after.is_empty() || after.starts_with(char::is_whitespace) {
        Some((status, after))
    } else {
        None
    }
}

/// Split a trimmed-left line into marker, status and content.
fn split_task(trimmed: &str) -> Option<(&str, char, &str)> {
    if let Some(len) = list_marker_len(trimmed) {
        let after_marker = &trimmed[len..];
        if after_marker.starts_with(char::is_whitespace) {
            let (status, content) = status_token(after_marker.trim_start())?;
            return Some((&trimmed[..len], status, content.trim()));
        }
    }
    let (status, content) = status_token(trimmed)?;
    Some(("", status, content.trim()))
}

pub fn is_task_line(trimmed: &str) -> bool {
    split_task(trimmed).is_some()
}

pub fn parse_task_line(line: &str) -> Option<TaskLine<'_>> {
    let trimmed = line.trim_start();
    let (list_marker, raw_status, content) = split_task(trimmed)?;
    Some(TaskLine {
        actual_spaces: leading_spaces(line),
        list_marker,
        raw_status,
        content,
    })
}

pub fn is_fence(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with("```") || trimmed.starts_with("~~~")
}

/// `(level, text)` for an ATX heading of level 1-6 with non-empty text.
pub fn extract_heading(line: &str) -> Option<(usize, String)> {
    let trimmed = line.trim();
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > 6 {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let text = rest.trim();
    (!text.is_empty()).then(|| (level, text.to_string()))
}

/// Collect the non-task lines after `start` that are indented deeper than the task.
/// A code fence ends the comment.
/// Returns the joined comment and how many lines it consumed.
pub fn extract_multiline_comment(
    lines: &[&str],
    start: usize,
    actual_spaces: usize,
) -> (Option<String>, usize) {
    let comment_lines: Vec<&str> = lines
        .iter()
        .skip(start)
        .map(|line| (leading_spaces(line), line.trim_start()))
        .take_while(|(spaces, trimmed)| {
            *spaces > actual_spaces && !is_task_line(trimmed) && !is_fence(trimmed)
        })
        .map(|(_, trimmed)| trimmed)
        .collect();

    if comment_lines.is_empty() {
        (None, 0)
    } else {
        let consumed = comment_lines.len();
        (Some(comment_lines.join("\n")), consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unordered_and_ordered_markers() {
        let t = parse_task_line("  - [x] Done thing").unwrap();
        assert_eq!(t.actual_spaces, 2);
        assert_eq!(t.list_marker, "-");
        assert_eq!(t.raw_status, 'x');
        assert_eq!(t.content, "Done thing");

        let t = parse_task_line("12) [/] Half").unwrap();
        assert_eq!(t.list_marker, "12)");
        assert_eq!(t.raw_status, '/');

        let t = parse_task_line("3. [ ] Third").unwrap();
        assert_eq!(t.list_marker, "3.");
        assert_eq!(t.raw_status, ' ');
    }

    #[test]
    fn test_marker_is_optional() {
        let t = parse_task_line("[ ] bare").unwrap();
        assert_eq!(t.list_marker, "");
        assert_eq!(t.content, "bare");
    }

    #[test]
    fn test_non_task_lines() {
        assert!(parse_task_line("- plain item").is_none());
        assert!(parse_task_line("-[ ] no space").is_none());
        assert!(parse_task_line("- [ab] two chars").is_none());
        assert!(parse_task_line("- [x]glued").is_none());
        assert!(parse_task_line("[link](http://x)").is_none());
        assert!(parse_task_line("").is_none());
    }

    #[test]
    fn test_empty_content_task() {
        let t = parse_task_line("- [ ] ").unwrap();
        assert_eq!(t.content, "");
    }

    #[test]
    fn test_headings() {
        assert_eq!(extract_heading("## Inbox"), Some((2, "Inbox".to_string())));
        assert_eq!(extract_heading("#tag line"), None);
        assert_eq!(extract_heading("###"), None);
        assert_eq!(extract_heading("####### seven"), None);
    }

    #[test]
    fn test_fences() {
        assert!(is_fence("```rust"));
        assert!(is_fence("  ~~~"));
        assert!(!is_fence("`inline`"));
    }

    #[test]
    fn test_multiline_comment() {
        let lines = vec![
            "- [ ] parent",
            "  first note",
            "    second note",
            "  - [ ] child",
            "after",
        ];
        let (comment, consumed) = extract_multiline_comment(&lines, 1, 0);
        assert_eq!(comment.as_deref(), Some("first note\nsecond note"));
        assert_eq!(consumed, 2);

        let (comment, consumed) = extract_multiline_comment(&lines, 4, 0);
        assert_eq!(comment, None);
        assert_eq!(consumed, 0);
    }
}
