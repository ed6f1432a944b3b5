// Regions of task text where `#` and `@` are not metadata markers:
// wiki links, markdown links, bare URLs, inline code and CSS color codes.
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static WIKI_LINK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[[^\]]+\]\]").expect("valid regex"));
static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\([^)]+\)").expect("valid regex"));
static BARE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:https?|ftp|mailto|file)://[^\s<>"{}|\\^`\[\]]+"#).expect("valid regex")
});

#[derive(Debug, Default)]
pub struct ProtectedRanges {
    ranges: Vec<Range<usize>>,
}

impl ProtectedRanges {
    pub fn detect(content: &str) -> Self {
        let mut ranges: Vec<Range<usize>> = Vec::new();
        for re in [&*WIKI_LINK, &*MARKDOWN_LINK, &*BARE_URL] {
            ranges.extend(re.find_iter(content).map(|m| m.range()));
        }
        ranges.extend(inline_code_spans(content));
        ranges.extend(color_codes(content));

        ranges.sort_by_key(|r| r.start);
        let mut merged: Vec<Range<usize>> = Vec::with_capacity(ranges.len());
        for r in ranges {
            match merged.last_mut() {
                Some(last) if last.end > r.start => last.end = last.end.max(r.end),
                _ => merged.push(r),
            }
        }
        Self { ranges: merged }
    }

    pub fn is_protected(&self, pos: usize) -> bool {
        self.ranges.iter().any(|r| r.contains(&pos))
    }

    /// Byte offset of the next `marker` at or after `from` outside every range.
    pub fn find_unprotected(&self, content: &str, marker: char, from: usize) -> Option<usize> {
        content
            .get(from..)?
            .match_indices(marker)
            .map(|(i, _)| from + i)
            .find(|pos| !self.is_protected(*pos))
    }

    pub fn ranges(&self) -> &[Range<usize>] {
        &self.ranges
    }
}

/// Backtick-delimited spans: a run of N backticks closed by the next run of exactly N.
fn inline_code_spans(content: &str) -> Vec<Range<usize>> {
    let bytes = content.as_bytes();
    let run_at = |i: usize| bytes[i..].iter().take_while(|b| **b == b'`').count();
    let mut spans = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }
        let open = run_at(i);
        let mut j = i + open;
        let mut closed = None;
        while j < bytes.len() {
            if bytes[j] == b'`' {
                let run = run_at(j);
                if run == open {
                    closed = Some(j + run);
                    break;
                }
                j += run;
            } else {
                j += 1;
            }
        }
        match closed {
            Some(end) if end > i + 2 * open => {
                spans.push(i..end);
                i = end;
            }
            _ => i += open,
        }
    }
    spans
}

/// `#RGB` / `#RRGGBB` standing alone between non-alphanumeric characters.
fn color_codes(content: &str) -> Vec<Range<usize>> {
    let bytes = content.as_bytes();
    content
        .match_indices('#')
        .filter_map(|(pos, _)| {
            let hex = bytes[pos + 1..]
                .iter()
                .take_while(|b| b.is_ascii_hexdigit())
                .count();
            if hex != 3 && hex != 6 {
                return None;
            }
            let end = pos + 1 + hex;
            let before_ok = content[..pos]
                .chars()
                .next_back()
                .is_none_or(|c| !c.is_ascii_alphanumeric());
            let after_ok = content[end..]
                .chars()
                .next()
                .is_none_or(|c| !c.is_ascii_alphanumeric());
            (before_ok && after_ok).then_some(pos..end)
        })
        .collect()
}
