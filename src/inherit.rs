// File-level metadata inheritance.
//
// Precedence, highest first: the task's own metadata (including fields derived
// from its tags), file frontmatter, then project-config data. Structural and
// identity fields are never inherited.
use crate::config::{MetadataParseMode, ParserConfig};
use crate::model::item::{MetadataMap, fields};
use crate::normalize::priority_to_metadata_value;
use serde_json::{Map, Value};

/// File-level key/value data handed in by the caller.
pub type FileMetadata = Map<String, Value>;

pub const NON_INHERITABLE_FIELDS: &[&str] = &[
    "id",
    "content",
    "status",
    "rawStatus",
    "completed",
    "line",
    "lineNumber",
    "originalMarkdown",
    "filePath",
    "heading",
    "headingLevel",
    "parent",
    "parentId",
    "children",
    "childrenIds",
    "indentLevel",
    "actualIndent",
    "listMarker",
    "tgProject",
    "comment",
    "metadata",
];

pub fn is_inheritable(key: &str) -> bool {
    !NON_INHERITABLE_FIELDS.contains(&key)
}

/// Scalar rendering of a frontmatter value. `None` for null.
pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(value_to_string)
                .collect::<Vec<_>>()
                .join(","),
        ),
        Value::Object(_) => Some(value.to_string()),
    }
}

/// `tag` with a leading `#`. Blank input stays blank.
pub fn normalize_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        trimmed.to_string()
    } else {
        format!("#{}", trimmed)
    }
}

/// `base` followed by every tag of `inherited` not already present, all normalized.
pub fn merge_tags(base: &[String], inherited: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(base.len() + inherited.len());
    for tag in base.iter().chain(inherited) {
        let tag = normalize_tag(tag);
        if !tag.is_empty() && !merged.contains(&tag) {
            merged.push(tag);
        }
    }
    merged
}

/// Read the `tags` metadata field: a JSON list, or a single plain tag.
pub fn parse_tags_field(raw: Option<&str>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(s) if s.trim().is_empty() => Vec::new(),
        Some(s) => match serde_json::from_str::<Vec<Value>>(s) {
            Ok(items) => items.iter().filter_map(value_to_string).collect(),
            Err(_) => vec![s.to_string()],
        },
    }
}

fn is_blank(map: &MetadataMap, key: &str) -> bool {
    map.get(key).is_none_or(|v| v.is_empty())
}

pub struct Inheritance<'a> {
    config: &'a ParserConfig,
    frontmatter: Option<&'a FileMetadata>,
    project_data: Option<&'a FileMetadata>,
}

impl<'a> Inheritance<'a> {
    pub fn new(
        config: &'a ParserConfig,
        frontmatter: Option<&'a FileMetadata>,
        project_data: Option<&'a FileMetadata>,
    ) -> Self {
        Self {
            config,
            frontmatter,
            project_data,
        }
    }

    fn enabled_for(&self, is_subtask: bool) -> bool {
        let inheritance = &self.config.file_metadata_inheritance;
        inheritance.enabled
            && inheritance.inherit_from_frontmatter
            && (!is_subtask || inheritance.inherit_from_frontmatter_for_subtasks)
    }

    /// Effective metadata for one task.
    pub fn apply(&self, task_metadata: &MetadataMap, is_subtask: bool) -> MetadataMap {
        let mut inherited = task_metadata.clone();
        if let Some(priority) = inherited.get_mut(fields::PRIORITY) {
            *priority = priority_to_metadata_value(priority);
        }
        if !self.enabled_for(is_subtask) {
            return inherited;
        }

        if let Some(frontmatter) = self.frontmatter {
            self.inherit_project_key(frontmatter, &mut inherited);
            for (key, value) in frontmatter {
                match value {
                    Value::Array(tags) if key == fields::TAGS => {
                        self.inherit_frontmatter_tags(tags, &mut inherited)
                    }
                    _ => {
                        if let Some(value) = value_to_string(value) {
                            set_if_blank(&mut inherited, key, value);
                        }
                    }
                }
            }
        }

        if let Some(project_data) = self.project_data {
            for (key, value) in project_data {
                if self.frontmatter.is_some_and(|fm| fm.contains_key(key)) {
                    continue;
                }
                if let Some(value) = value_to_string(value) {
                    set_if_blank(&mut inherited, key, value);
                }
            }
        }
        inherited
    }

    /// Frontmatter stored under a custom project key still fills `project`,
    /// unless project detection from frontmatter is switched on.
    fn inherit_project_key(&self, frontmatter: &FileMetadata, inherited: &mut MetadataMap) {
        let Some(project_config) = &self.config.project_config else {
            return;
        };
        if project_config.enable_enhanced_project && project_config.metadata_config.enabled {
            return;
        }
        let key = &project_config.metadata_config.metadata_key;
        let value = frontmatter
            .get(key)
            .and_then(value_to_string)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        if let Some(value) = value {
            set_if_blank(inherited, fields::PROJECT, value);
        }
    }

    fn inherit_frontmatter_tags(&self, tags: &[Value], inherited: &mut MetadataMap) {
        let mut plain = Vec::new();
        for tag in tags.iter().filter_map(value_to_string) {
            match self.special_tag(&tag) {
                Some((field, value)) => set_if_blank(inherited, &field, value),
                None => plain.push(tag),
            }
        }
        if is_blank(inherited, fields::TAGS) {
            let normalized = merge_tags(&[], &plain);
            if let Ok(json) = serde_json::to_string(&normalized) {
                inherited.insert(fields::TAGS.to_string(), json);
            }
        }
    }

    fn special_tag(&self, tag: &str) -> Option<(String, String)> {
        if self.config.metadata_parse_mode == MetadataParseMode::None {
            return None;
        }
        let body = tag.trim().trim_start_matches('#');
        let (prefix, value) = body.split_once('/')?;
        let field = self.config.special_prefix_field(prefix)?;
        Some((field.to_string(), value.to_string()))
    }
}

fn set_if_blank(inherited: &mut MetadataMap, key: &str, value: String) {
    if !is_inheritable(key) || !is_blank(inherited, key) {
        return;
    }
    let value = if key == fields::PRIORITY {
        priority_to_metadata_value(&value)
    } else {
        value
    };
    inherited.insert(key.to_string(), value);
}
