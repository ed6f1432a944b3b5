// Canonical values for raw priority and date tokens.
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Named levels, synonyms and priority emoji on the 5 (highest) to 1 (lowest) scale.
static PRIORITY_TABLE: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("highest", 5),
        ("high", 4),
        ("medium", 3),
        ("low", 2),
        ("lowest", 1),
        ("urgent", 5),
        ("critical", 5),
        ("important", 4),
        ("normal", 3),
        ("moderate", 3),
        ("minor", 2),
        ("trivial", 1),
        ("🔺", 5),
        ("⏫", 4),
        ("🔼", 3),
        ("🔽", 2),
        ("⏬️", 1),
        ("⏬", 1),
    ])
});

/// Built-in formats, tried after any caller-supplied ones.
pub const DEFAULT_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%m/%d/%Y",
    "%Y.%m.%d",
    "%d.%m.%Y",
    "%Y年%m月%d日",
    "%b %d, %Y",
    "%d %b %Y",
    "%Y%m%d%H%M%S",
    "%Y%m%d_%H%M%S",
];

/// Map a raw priority token to the 1-5 scale.
///
/// Integers pass through unchanged. Anything unrecognized is `None`; there is
/// no fallback level.
pub fn normalize_priority(raw: &str) -> Option<u32> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(n) = value.parse::<u32>() {
        return Some(n);
    }
    PRIORITY_TABLE
        .get(value.to_lowercase().as_str())
        .or_else(|| PRIORITY_TABLE.get(value))
        .copied()
}

/// Priority value as stored in a metadata map: the normalized integer when one
/// exists, otherwise the input unchanged.
pub fn priority_to_metadata_value(raw: &str) -> String {
    match normalize_priority(raw) {
        Some(n) => n.to_string(),
        None => raw.to_string(),
    }
}

fn parse_one(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, format)
                .ok()
                .map(|dt| dt.date())
        })
}

/// Parse a date string, trying `custom_formats` before the defaults and
/// falling back to ISO-8601 timestamps. Times are dropped (start of day).
pub fn parse_date_with_formats(raw: &str, custom_formats: &[String]) -> Option<NaiveDate> {
    let value = raw.trim();
    if value.is_empty() || value.contains("{{") || value.contains("}}") {
        return None;
    }

    let found = custom_formats
        .iter()
        .map(String::as_str)
        .chain(DEFAULT_DATE_FORMATS.iter().copied())
        .find_map(|format| parse_one(value, format));
    if found.is_some() {
        return found;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            log::debug!("Could not parse date '{}' with any known format", value);
            None
        })
}

/// The first `YYYY-MM-DD` run inside `s`, with its byte range.
pub fn find_iso_date(s: &str) -> Option<(usize, usize)> {
    let bytes = s.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    (0..=bytes.len() - 10).find_map(|start| {
        let w = &bytes[start..start + 10];
        let digits = |r: std::ops::Range<usize>| w[r].iter().all(u8::is_ascii_digit);
        (digits(0..4) && w[4] == b'-' && digits(5..7) && w[7] == b'-' && digits(8..10))
            .then_some((start, start + 10))
    })
}
