// Loading parser configuration from TOML files on disk.
use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use taskmark::cache::DateCache;
use taskmark::config::MetadataParseMode;
use taskmark::{MarkdownTaskParser, MetadataSources, ParserConfig};
use uuid::Uuid;

fn write_temp_config(contents: &str) -> PathBuf {
    let path = env::temp_dir().join(format!("taskmark_config_{}.toml", Uuid::new_v4()));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_overrides_and_keeps_defaults() {
    let path = write_temp_config(
        r#"
parse_comments = false
metadata_parse_mode = "DataviewOnly"
custom_date_formats = ["%d/%m/%Y"]

[special_tag_prefixes]
project = "project"
area = "area"

[file_metadata_inheritance]
enabled = true
"#,
    );
    let config = ParserConfig::load(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert!(!config.parse_comments);
    assert!(config.parse_tags);
    assert_eq!(config.metadata_parse_mode, MetadataParseMode::DataviewOnly);
    assert_eq!(config.max_metadata_iterations, 50);
    assert!(config.file_metadata_inheritance.inherit_from_frontmatter);
    assert_eq!(config.emoji_mapping, ParserConfig::default().emoji_mapping);

    let parser = MarkdownTaskParser::new(config).with_date_cache(Arc::new(DateCache::default()));
    let tasks = parser.parse(
        "- [ ] x #area/ops 📅 2025-01-01 [due:: 19/06/2025]\n  a comment",
        "f.md",
        &MetadataSources::default(),
    );
    assert_eq!(tasks[0].metadata["area"], "ops");
    assert_eq!(tasks[0].metadata["dueDate"], "19/06/2025");
    assert_eq!(
        tasks[0].typed.due_date.map(|d| d.to_string()).as_deref(),
        Some("2025-06-19")
    );
    assert!(tasks[0].content.contains("📅 2025-01-01"));
    assert_eq!(tasks[0].comment, None);
}

#[test]
fn test_load_reports_missing_file() {
    let path = env::temp_dir().join(format!("taskmark_missing_{}.toml", Uuid::new_v4()));
    let err = ParserConfig::load(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to read config file"));
}

#[test]
fn test_load_reports_bad_toml() {
    let path = write_temp_config("max_parse_iterations = \"lots\"");
    let err = ParserConfig::load(&path).unwrap_err();
    let _ = fs::remove_file(&path);
    assert!(format!("{:#}", err).contains("Failed to parse config file"));
}
