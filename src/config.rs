// File: ./src/config.rs
// Parser configuration: recognized syntax, mappings, bounds and inheritance switches.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use strum::{EnumIter, EnumString};

fn default_true() -> bool {
    true
}

fn default_max_parse_iterations() -> usize {
    100_000
}
fn default_max_metadata_iterations() -> usize {
    50
}
fn default_max_stack_operations() -> usize {
    1000
}
fn default_max_stack_size() -> usize {
    50
}

fn default_status_mapping() -> BTreeMap<String, char> {
    BTreeMap::from([
        ("TODO".to_string(), ' '),
        ("IN_PROGRESS".to_string(), '/'),
        ("DONE".to_string(), 'x'),
        ("CANCELLED".to_string(), '-'),
    ])
}

fn default_emoji_mapping() -> BTreeMap<String, String> {
    [
        ("📅", "dueDate"),
        ("🛫", "startDate"),
        ("⏳", "scheduledDate"),
        ("✅", "completedDate"),
        ("➕", "createdDate"),
        ("❌", "cancelledDate"),
        ("🆔", "id"),
        ("⛔", "dependsOn"),
        ("🏁", "onCompletion"),
        ("🔁", "repeat"),
        ("🔺", "priority"),
        ("⏫", "priority"),
        ("🔼", "priority"),
        ("🔽", "priority"),
        ("⏬", "priority"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn default_special_tag_prefixes() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("project".to_string(), "project".to_string()),
        ("@".to_string(), "context".to_string()),
    ])
}

fn default_project_key() -> String {
    "project".to_string()
}
fn default_project_file_name() -> String {
    "project.md".to_string()
}

/// Which inline metadata notations are recognized.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumIter, EnumString,
)]
pub enum MetadataParseMode {
    EmojiOnly,
    DataviewOnly,
    #[default]
    Both,
    None,
}

impl MetadataParseMode {
    pub fn allows_dataview(&self) -> bool {
        matches!(self, Self::DataviewOnly | Self::Both)
    }

    pub fn allows_emoji(&self) -> bool {
        matches!(self, Self::EmojiOnly | Self::Both)
    }
}

impl fmt::Display for MetadataParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataParseMode::EmojiOnly => write!(f, "Emoji only"),
            MetadataParseMode::DataviewOnly => write!(f, "Dataview only"),
            MetadataParseMode::Both => write!(f, "Emoji and Dataview"),
            MetadataParseMode::None => write!(f, "None"),
        }
    }
}

/// Switches controlling how file-level metadata flows into tasks.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct InheritanceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub inherit_from_frontmatter: bool,
    #[serde(default)]
    pub inherit_from_frontmatter_for_subtasks: bool,
}

impl Default for InheritanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            inherit_from_frontmatter: true,
            inherit_from_frontmatter_for_subtasks: false,
        }
    }
}

/// A path rule: files whose path contains `path_pattern` belong to `project_name`.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PathMapping {
    pub path_pattern: String,
    pub project_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MetadataDetection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_project_key")]
    pub metadata_key: String,
}

impl Default for MetadataDetection {
    fn default() -> Self {
        Self {
            enabled: false,
            metadata_key: default_project_key(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ConfigFileDetection {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_project_file_name")]
    pub file_name: String,
}

impl Default for ConfigFileDetection {
    fn default() -> Self {
        Self {
            enabled: false,
            file_name: default_project_file_name(),
        }
    }
}

/// Project attribution sources, consulted in order: path rules, frontmatter key, config file.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProjectConfig {
    #[serde(default)]
    pub enable_enhanced_project: bool,
    #[serde(default)]
    pub path_mappings: Vec<PathMapping>,
    #[serde(default)]
    pub metadata_config: MetadataDetection,
    #[serde(default)]
    pub config_file: ConfigFileDetection,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ParserConfig {
    #[serde(default = "default_true")]
    pub parse_metadata: bool,
    #[serde(default = "default_true")]
    pub parse_tags: bool,
    #[serde(default = "default_true")]
    pub parse_comments: bool,
    #[serde(default = "default_true")]
    pub parse_headings: bool,
    #[serde(default)]
    pub metadata_parse_mode: MetadataParseMode,

    /// Status name -> checkbox character.
    #[serde(default = "default_status_mapping")]
    pub status_mapping: BTreeMap<String, char>,
    /// Emoji -> metadata field name.
    #[serde(default = "default_emoji_mapping")]
    pub emoji_mapping: BTreeMap<String, String>,
    /// Tag namespace (text before `/`) -> metadata field name.
    #[serde(default = "default_special_tag_prefixes")]
    pub special_tag_prefixes: BTreeMap<String, String>,

    #[serde(default = "default_max_parse_iterations")]
    pub max_parse_iterations: usize,
    #[serde(default = "default_max_metadata_iterations")]
    pub max_metadata_iterations: usize,
    #[serde(default = "default_max_stack_operations")]
    pub max_stack_operations: usize,
    #[serde(default = "default_max_stack_size")]
    pub max_stack_size: usize,

    /// chrono format strings tried before the built-in date formats.
    #[serde(default)]
    pub custom_date_formats: Vec<String>,

    #[serde(default)]
    pub file_metadata_inheritance: InheritanceConfig,
    #[serde(default)]
    pub project_config: Option<ProjectConfig>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            parse_metadata: true,
            parse_tags: true,
            parse_comments: true,
            parse_headings: true,
            metadata_parse_mode: MetadataParseMode::default(),
            status_mapping: default_status_mapping(),
            emoji_mapping: default_emoji_mapping(),
            special_tag_prefixes: default_special_tag_prefixes(),
            max_parse_iterations: default_max_parse_iterations(),
            max_metadata_iterations: default_max_metadata_iterations(),
            max_stack_operations: default_max_stack_operations(),
            max_stack_size: default_max_stack_size(),
            custom_date_formats: Vec::new(),
            file_metadata_inheritance: InheritanceConfig::default(),
            project_config: None,
        }
    }
}

impl ParserConfig {
    /// Load a configuration from a TOML file.
    /// Missing keys fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file '{}'", path.display()))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: ParserConfig = toml::from_str(contents)?;
        Ok(config)
    }

    /// Copy of this configuration with a replaced status mapping.
    pub fn with_status_mapping(&self, status_mapping: BTreeMap<String, char>) -> Self {
        Self {
            status_mapping,
            ..self.clone()
        }
    }

    /// Canonical status name for a raw checkbox character.
    pub fn status_name(&self, raw: char) -> Option<&str> {
        self.status_mapping
            .iter()
            .find(|(_, c)| **c == raw)
            .map(|(name, _)| name.as_str())
    }

    /// Field name for a tag namespace: exact match first, then lower-cased.
    pub fn special_prefix_field(&self, prefix: &str) -> Option<&str> {
        self.special_tag_prefixes
            .get(prefix)
            .or_else(|| self.special_tag_prefixes.get(&prefix.to_lowercase()))
            .map(String::as_str)
    }

    pub fn is_emoji(&self, s: &str) -> bool {
        self.emoji_mapping.keys().any(|e| s.starts_with(e.as_str()))
    }
}
