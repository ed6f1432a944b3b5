// Inline metadata recognizers and the stripping loop that composes them.
//
// Four notations are recognized, tried in this order on every pass:
//   [key:: value]     dataview-style annotation
//   📅 2025-01-01     emoji-coded field (emoji set comes from the config)
//   @context          context reference
//   #tag, #prefix/val plain tag, or a metadata field for configured prefixes
//
// Each successful match strips the token and restarts the pass. The number of
// passes is capped by `max_metadata_iterations`.
use crate::config::ParserConfig;
use crate::model::item::{MetadataMap, fields};
use crate::normalize::{find_iso_date, normalize_priority};
use crate::parser::protect::ProtectedRanges;
use serde::Serialize;

/// Full-width and CJK punctuation plus typographic quotes end a tag or context.
const PUNCTUATION_BLOCKLIST: &[char] = &[
    '，', '。', '；', '：', '！', '？', '「', '」', '『', '』', '（', '）', '【', '】', '\u{201C}',
    '\u{201D}', '\u{2018}', '\u{2019}',
];

const FILE_EXTENSIONS: &[&str] = &[".md", ".canvas", ".txt", ".pdf"];
const VARIATION_SELECTOR: char = '\u{FE0F}';

/// Result of stripping metadata from a task's text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Extracted {
    pub content: String,
    pub metadata: MetadataMap,
    pub tags: Vec<String>,
}

#[derive(Debug)]
enum Token<'s> {
    Dataview {
        key: String,
        value: String,
        remaining: String,
    },
    Emoji {
        key: String,
        value: String,
        before: &'s str,
        after: &'s str,
    },
    Context {
        value: &'s str,
        before: &'s str,
        after: &'s str,
    },
    Tag {
        tag: String,
        before: &'s str,
        after: &'s str,
    },
}

fn is_token_char(c: char, allow_slash: bool) -> bool {
    c.is_ascii_alphanumeric()
        || c == '-'
        || c == '_'
        || (allow_slash && c == '/')
        || (!c.is_ascii() && !c.is_whitespace() && !PUNCTUATION_BLOCKLIST.contains(&c))
}

fn token_len(s: &str, allow_slash: bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !is_token_char(*c, allow_slash))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn is_blocked_before(c: char) -> bool {
    c.is_ascii_alphanumeric() || "#@$%^&*".contains(c)
}

fn is_valid_tag_start(content: &str, pos: usize) -> bool {
    match content[..pos].chars().next_back() {
        None => true,
        Some(prev) if prev.is_whitespace() || "([{<,;:!?-+*/\\|=".contains(prev) => true,
        Some(prev) => !is_blocked_before(prev),
    }
}

fn is_valid_context_start(content: &str, pos: usize) -> bool {
    match content[..pos].chars().next_back() {
        None => true,
        Some(prev) => prev.is_whitespace() || !is_blocked_before(prev),
    }
}

fn is_escaped(content: &str, pos: usize) -> bool {
    let backslashes = content.as_bytes()[..pos]
        .iter()
        .rev()
        .take_while(|b| **b == b'\\')
        .count();
    backslashes % 2 == 1
}

fn dataview_field(key: &str, config: &ParserConfig) -> String {
    let lower = key.to_lowercase();
    let mapped = match lower.as_str() {
        "due" => Some(fields::DUE_DATE),
        "start" => Some(fields::START_DATE),
        "scheduled" => Some(fields::SCHEDULED_DATE),
        "completion" => Some(fields::COMPLETED_DATE),
        "created" => Some(fields::CREATED_DATE),
        "cancelled" => Some(fields::CANCELLED_DATE),
        "id" => Some(fields::ID),
        "dependson" => Some(fields::DEPENDS_ON),
        "oncompletion" => Some(fields::ON_COMPLETION),
        _ => None,
    };
    if let Some(field) = mapped {
        return field.to_string();
    }
    config
        .special_tag_prefixes
        .iter()
        .find(|(prefix, _)| prefix.to_lowercase() == lower)
        .map(|(_, field)| field.clone())
        .unwrap_or_else(|| key.to_string())
}

/// End of a `.md`/`.canvas`/... file reference starting at `pos`, if one is there.
fn file_extension_end(s: &str, pos: usize) -> Option<usize> {
    let rest = &s[pos..];
    FILE_EXTENSIONS.iter().find_map(|ext| {
        if !rest.starts_with(ext) {
            return None;
        }
        let mut end = pos + ext.len();
        if s[end..].starts_with('#') {
            end += s[end..].find(' ').unwrap_or(s.len() - end);
        }
        (end >= s.len() || s[end..].starts_with(' ')).then_some(end)
    })
}

fn normalize_depends_on(value: &str) -> String {
    value
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

pub struct MetadataExtractor<'c> {
    config: &'c ParserConfig,
}

impl<'c> MetadataExtractor<'c> {
    pub fn new(config: &'c ParserConfig) -> Self {
        Self { config }
    }

    fn dataview_enabled(&self) -> bool {
        self.config.parse_metadata && self.config.metadata_parse_mode.allows_dataview()
    }

    fn emoji_enabled(&self) -> bool {
        self.config.parse_metadata && self.config.metadata_parse_mode.allows_emoji()
    }

    /// Strip every recognized token from `content`.
    pub fn extract(&self, content: &str) -> Extracted {
        let mut out = self.extract_untrimmed(content, true);
        out.content = out.content.trim().to_string();
        out
    }

    /// Tags and contexts only; bracket and emoji fields are left as text.
    pub fn extract_tags_only(&self, content: &str) -> Extracted {
        let mut out = self.extract_untrimmed(content, false);
        out.content = out.content.trim().to_string();
        out
    }

    fn extract_untrimmed(&self, content: &str, with_fields: bool) -> Extracted {
        let mut out = Extracted::default();
        let mut remaining = content.to_string();
        let mut iterations = 0;

        loop {
            if iterations >= self.config.max_metadata_iterations {
                log::warn!(
                    "Maximum metadata iterations reached for '{}', keeping the rest as text",
                    content
                );
                out.content.push_str(&remaining);
                break;
            }
            iterations += 1;

            let Some(token) = self.next_token(&remaining, with_fields) else {
                out.content.push_str(&remaining);
                break;
            };

            remaining = match token {
                Token::Dataview {
                    key,
                    value,
                    remaining,
                } => {
                    out.metadata.insert(key, value);
                    remaining
                }
                Token::Emoji {
                    key,
                    value,
                    before,
                    after,
                } => {
                    self.absorb_prefix(before, &mut out);
                    out.metadata.insert(key, value);
                    after.to_string()
                }
                Token::Context {
                    value,
                    before,
                    after,
                } => {
                    self.absorb_prefix(before, &mut out);
                    out.metadata
                        .insert(fields::CONTEXT.to_string(), value.to_string());
                    after.to_string()
                }
                Token::Tag { tag, before, after } => {
                    out.content.push_str(before);
                    self.apply_tag(tag, &mut out);
                    after.to_string()
                }
            };
        }
        out
    }

    /// Text that preceded a token may still hold tags and contexts.
    fn absorb_prefix(&self, before: &str, out: &mut Extracted) {
        let inner = self.extract_untrimmed(before, false);
        out.content.push_str(&inner.content);
        out.tags.extend(inner.tags);
        out.metadata.extend(inner.metadata);
    }

    fn next_token<'s>(&self, s: &'s str, with_fields: bool) -> Option<Token<'s>> {
        if with_fields
            && self.dataview_enabled()
            && let Some(token) = self.find_dataview(s)
        {
            return Some(token);
        }
        if with_fields
            && self.emoji_enabled()
            && let Some(token) = self.find_emoji(s)
        {
            return Some(token);
        }
        if !self.config.parse_tags {
            return None;
        }
        let protected = ProtectedRanges::detect(s);
        find_context(s, &protected).or_else(|| find_tag(s, &protected))
    }

    /// Route a `#prefix/value` tag to its metadata field, or keep it as a tag.
    fn apply_tag(&self, tag: String, out: &mut Extracted) {
        if let Some((field, value)) = self.special_tag_field(&tag) {
            log::debug!("Tag '{}' mapped to metadata field '{}'", tag, field);
            out.metadata.insert(field, value);
        } else {
            out.tags.push(tag);
        }
    }

    /// `(field, value)` when `tag` uses a configured prefix and metadata is enabled.
    pub fn special_tag_field(&self, tag: &str) -> Option<(String, String)> {
        if self.config.metadata_parse_mode == crate::config::MetadataParseMode::None {
            return None;
        }
        let body = tag.strip_prefix('#').unwrap_or(tag);
        let (prefix, value) = body.split_once('/')?;
        let field = self.config.special_prefix_field(prefix)?;
        Some((field.to_string(), value.to_string()))
    }

    fn find_dataview<'s>(&self, s: &'s str) -> Option<Token<'s>> {
        let mut from = 0;
        while let Some(offset) = s[from..].find('[') {
            let start = from + offset;
            from = start + 1;
            let Some(close) = s[start..].find(']') else {
                break;
            };
            let end = start + close;
            let Some((key, value)) = s[start + 1..end].split_once("::") else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                continue;
            }
            let remaining = format!("{}{}", &s[..start], &s[end + 1..]);
            return Some(Token::Dataview {
                key: dataview_field(key, self.config),
                value: value.to_string(),
                remaining,
            });
        }
        None
    }

    fn find_emoji<'s>(&self, s: &'s str) -> Option<Token<'s>> {
        let (pos, emoji, field) = self
            .config
            .emoji_mapping
            .iter()
            .filter_map(|(emoji, field)| s.find(emoji.as_str()).map(|pos| (pos, emoji, field)))
            .min_by(|a, b| a.0.cmp(&b.0).then(b.1.len().cmp(&a.1.len())))?;

        let before = &s[..pos];
        let mut emoji_end = pos + emoji.len();
        // A trailing variation selector belongs to the emoji.
        if s[emoji_end..].starts_with(VARIATION_SELECTOR) {
            emoji_end += VARIATION_SELECTOR.len_utf8();
        }
        let after_emoji = &s[emoji_end..];
        let value_start = after_emoji.len() - after_emoji.trim_start().len();
        let value_part = &after_emoji[value_start..];
        let value_end = self.emoji_value_end(value_part);
        let value = value_part[..value_end].trim();

        let mut consumed = emoji_end + value_start + value_end;
        let stored = match field.as_str() {
            fields::PRIORITY if value.is_empty() || normalize_priority(value).is_none() => {
                // Text after a bare priority emoji is ordinary content.
                consumed = emoji_end;
                emoji.clone()
            }
            fields::DEPENDS_ON if !value.is_empty() => normalize_depends_on(value),
            _ if value.is_empty() => "true".to_string(),
            _ => value.to_string(),
        };
        let stored = if fields::is_date_field(field) {
            match find_iso_date(&stored) {
                Some((a, b)) => stored[a..b].to_string(),
                None => stored,
            }
        } else {
            stored
        };

        Some(Token::Emoji {
            key: field.clone(),
            value: stored,
            before,
            after: &s[consumed..],
        })
    }

    /// Where an emoji's value stops: another emoji, `[`, a tag or context, or
    /// just after a file reference.
    fn emoji_value_end(&self, value_part: &str) -> usize {
        let mut chars = value_part.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if c == '[' || self.config.is_emoji(&value_part[i..]) {
                return i;
            }
            if let Some(end) = file_extension_end(value_part, i) {
                return end;
            }
            if c == '#' || c == '@' {
                return i;
            }
            if c.is_whitespace() && matches!(chars.peek(), Some((_, '#' | '@'))) {
                return i;
            }
        }
        value_part.len()
    }
}

fn find_context<'s>(s: &'s str, protected: &ProtectedRanges) -> Option<Token<'s>> {
    let mut from = 0;
    while let Some(at) = protected.find_unprotected(s, '@', from) {
        from = at + 1;
        if !is_valid_context_start(s, at) {
            continue;
        }
        let len = token_len(&s[at + 1..], false);
        if len > 0 {
            return Some(Token::Context {
                value: &s[at + 1..at + 1 + len],
                before: &s[..at],
                after: &s[at + 1 + len..],
            });
        }
    }
    None
}

fn find_tag<'s>(s: &'s str, protected: &ProtectedRanges) -> Option<Token<'s>> {
    let mut from = 0;
    while let Some(hash) = protected.find_unprotected(s, '#', from) {
        from = hash + 1;
        if is_escaped(s, hash) || !is_valid_tag_start(s, hash) {
            continue;
        }
        let len = token_len(&s[hash + 1..], true);
        if len > 0 {
            return Some(Token::Tag {
                tag: s[hash..hash + 1 + len].to_string(),
                before: &s[..hash],
                after: &s[hash + 1 + len..],
            });
        }
    }
    None
}
