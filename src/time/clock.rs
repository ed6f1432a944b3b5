// Plain clock-time recognizer: `14:30`, `2:30 pm`, `9am`, and ranges `9:00-10:30`.
// Surrounding keywords decide which field a time belongs to.
use super::{TimeComponents, TimeParseResult, TimeParser};
use crate::model::item::{TimeComponent, TimeField};
use once_cell::sync::Lazy;
use regex::Regex;

static TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::([0-5]\d))?(?::([0-5]\d))?\s*(am|pm)?\b").expect("valid regex")
});
static RANGE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-~～]\s*").expect("valid regex"));

const START_KEYWORDS: &[&str] = &["start", "from", "begins", "🛫"];
const SCHEDULED_KEYWORDS: &[&str] = &["scheduled", "at ", "⏳"];
const DUE_KEYWORDS: &[&str] = &["due", "by ", "deadline", "📅"];

/// Hour/minute from regex captures, rejecting bare numbers without `:` or am/pm.
fn to_component(caps: &regex::Captures<'_>) -> Option<TimeComponent> {
    let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute = caps.get(2).map(|m| m.as_str().parse().ok()).unwrap_or(Some(0))?;
    let second = match caps.get(3) {
        Some(s) => Some(s.as_str().parse().ok()?),
        None => None,
    };

    let hour = match caps.get(4).map(|m| m.as_str().to_lowercase()) {
        Some(period) => {
            if !(1..=12).contains(&hour) {
                return None;
            }
            match (period.as_str(), hour) {
                ("am", 12) => 0,
                ("pm", 12) => 12,
                ("pm", h) => h + 12,
                (_, h) => h,
            }
        }
        None if caps.get(2).is_none() => return None,
        None if hour > 23 => return None,
        None => hour,
    };

    Some(TimeComponent {
        hour,
        minute,
        second,
        original_text: caps.get(0)?.as_str().trim().to_string(),
    })
}

fn boundary_at_or_before(text: &str, mut i: usize) -> usize {
    while !text.is_char_boundary(i) {
        i -= 1;
    }
    i
}

fn boundary_at_or_after(text: &str, mut i: usize) -> usize {
    while !text.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn context_field(text: &str, start: usize, end: usize) -> TimeField {
    let before_from = boundary_at_or_before(text, start.saturating_sub(20));
    let after_to = boundary_at_or_after(text, (end + 20).min(text.len()));
    let context = format!("{} {}", &text[before_from..start], &text[end..after_to]).to_lowercase();
    let has = |keywords: &[&str]| keywords.iter().any(|k| context.contains(k));

    if has(START_KEYWORDS) {
        TimeField::StartTime
    } else if has(SCHEDULED_KEYWORDS) {
        TimeField::ScheduledTime
    } else if has(DUE_KEYWORDS) || !context.contains('@') {
        TimeField::DueTime
    } else {
        TimeField::ScheduledTime
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClockTimeParser;

impl ClockTimeParser {
    pub fn new() -> Self {
        Self
    }

    fn extract(&self, text: &str) -> TimeComponents {
        let mut components = TimeComponents::new();
        let matches: Vec<_> = TIME.captures_iter(text).collect();
        let mut i = 0;

        while i < matches.len() {
            let caps = &matches[i];
            i += 1;
            let Some(whole) = caps.get(0) else { continue };
            // Dates like 2025-06-19 are not times.
            let after_dash = text[..whole.start()].ends_with('-');
            let before_dash = text[whole.end()..].starts_with('-') && caps.get(2).is_none();
            if after_dash || before_dash {
                continue;
            }
            let Some(component) = to_component(caps) else {
                continue;
            };

            let range_end = matches.get(i).and_then(|next| {
                let next_whole = next.get(0)?;
                let gap = &text[whole.end()..next_whole.start()];
                if RANGE_SEPARATOR.find(gap).is_some_and(|m| m.end() == gap.len()) {
                    to_component(next).map(|c| (c, next_whole.end()))
                } else {
                    None
                }
            });

            if let Some((end_component, end)) = range_end {
                i += 1;
                let field = context_field(text, whole.start(), end);
                if field == TimeField::StartTime || !components.contains_key(&TimeField::StartTime)
                {
                    components.insert(TimeField::StartTime, component);
                    components.insert(TimeField::EndTime, end_component);
                }
                continue;
            }

            let field = context_field(text, whole.start(), whole.end());
            components.entry(field).or_insert(component);
        }

        if let Some(start) = components.get(&TimeField::StartTime).cloned() {
            components.entry(TimeField::ScheduledTime).or_insert(start);
        }
        components
    }
}

impl TimeParser for ClockTimeParser {
    fn parse_time_components(&self, text: &str) -> anyhow::Result<TimeParseResult> {
        Ok(TimeParseResult {
            time_components: self.extract(text),
            ..TimeParseResult::default()
        })
    }
}
