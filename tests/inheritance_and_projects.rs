// Frontmatter / project-config inheritance and project attribution through `parse`.
use serde_json::{Value, json};
use std::sync::Arc;
use taskmark::cache::DateCache;
use taskmark::config::{InheritanceConfig, PathMapping, ProjectConfig};
use taskmark::inherit::FileMetadata;
use taskmark::model::{AttributionKind, ProjectAttribution};
use taskmark::{MarkdownTaskParser, MetadataSources, ParserConfig};

fn object(value: Value) -> FileMetadata {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

fn inheriting_config() -> ParserConfig {
    ParserConfig {
        file_metadata_inheritance: InheritanceConfig {
            enabled: true,
            inherit_from_frontmatter: true,
            inherit_from_frontmatter_for_subtasks: false,
        },
        ..ParserConfig::default()
    }
}

fn parser(config: ParserConfig) -> MarkdownTaskParser {
    MarkdownTaskParser::new(config).with_date_cache(Arc::new(DateCache::default()))
}

#[test]
fn test_precedence_example() {
    let sources = MetadataSources {
        frontmatter: Some(object(json!({"dueDate": "2099-01-01", "project": "X"}))),
        project_config: Some(object(json!({"project": "Y", "context": "Z"}))),
        fallback_project: None,
    };
    let tasks = parser(inheriting_config()).parse(
        "- [ ] Report [due:: 2025-01-01]",
        "f.md",
        &sources,
    );
    let m = &tasks[0].metadata;
    assert_eq!(m["dueDate"], "2025-01-01");
    assert_eq!(m["project"], "X");
    assert_eq!(m["context"], "Z");
    assert_eq!(tasks[0].typed.project.as_deref(), Some("X"));
}

#[test]
fn test_task_tag_beats_frontmatter() {
    let sources = MetadataSources {
        frontmatter: Some(object(json!({"project": "FromFile"}))),
        ..MetadataSources::default()
    };
    let tasks = parser(inheriting_config()).parse(
        "- [ ] Write report #project/Foo",
        "f.md",
        &sources,
    );
    assert_eq!(tasks[0].metadata["project"], "Foo");
    assert!(tasks[0].tags.is_empty());
}

#[test]
fn test_frontmatter_tags_merge_into_task_tags() {
    let sources = MetadataSources {
        frontmatter: Some(object(json!({"tags": ["work", "project/Apollo", "#errand"]}))),
        ..MetadataSources::default()
    };
    let tasks = parser(inheriting_config()).parse("- [ ] Buy milk #errand", "f.md", &sources);
    assert_eq!(tasks[0].tags, vec!["#errand", "#work"]);
    assert_eq!(tasks[0].metadata["project"], "Apollo");
}

#[test]
fn test_subtasks_do_not_inherit_by_default() {
    let sources = MetadataSources {
        frontmatter: Some(object(json!({"context": "office"}))),
        ..MetadataSources::default()
    };
    let input = "- [ ] parent\n  - [ ] child";
    let tasks = parser(inheriting_config()).parse(input, "f.md", &sources);
    assert_eq!(tasks[0].typed.context.as_deref(), Some("office"));
    assert_eq!(tasks[1].typed.context, None);

    let mut config = inheriting_config();
    config.file_metadata_inheritance.inherit_from_frontmatter_for_subtasks = true;
    let tasks = parser(config).parse(input, "f.md", &sources);
    assert_eq!(tasks[1].typed.context.as_deref(), Some("office"));
}

#[test]
fn test_structural_fields_never_inherited() {
    let sources = MetadataSources {
        frontmatter: Some(object(json!({"id": "frontmatter-id", "heading": "Nope", "area": "ops"}))),
        ..MetadataSources::default()
    };
    let tasks = parser(inheriting_config()).parse("- [ ] x", "f.md", &sources);
    assert!(!tasks[0].metadata.contains_key("id"));
    assert!(!tasks[0].metadata.contains_key("heading"));
    assert_eq!(tasks[0].typed.area.as_deref(), Some("ops"));
    assert_eq!(tasks[0].heading, None);
}

#[test]
fn test_inherited_priority_word_becomes_number() {
    let sources = MetadataSources {
        frontmatter: Some(object(json!({"priority": "urgent"}))),
        ..MetadataSources::default()
    };
    let tasks = parser(inheriting_config()).parse("- [ ] x\n- [ ] y 🔽", "f.md", &sources);
    assert_eq!(tasks[0].metadata["priority"], "5");
    assert_eq!(tasks[0].typed.priority, Some(5));
    assert_eq!(tasks[1].typed.priority, Some(2));
}

#[test]
fn test_inheritance_off_ignores_file_data() {
    let sources = MetadataSources {
        frontmatter: Some(object(json!({"context": "office"}))),
        project_config: Some(object(json!({"area": "ops"}))),
        fallback_project: None,
    };
    let tasks = parser(ParserConfig::default()).parse("- [ ] x", "f.md", &sources);
    assert!(tasks[0].metadata.is_empty());
}

fn project_config() -> ProjectConfig {
    let mut config = ProjectConfig {
        enable_enhanced_project: true,
        path_mappings: vec![PathMapping {
            path_pattern: "clients/acme".to_string(),
            project_name: "Acme".to_string(),
            enabled: true,
        }],
        ..ProjectConfig::default()
    };
    config.metadata_config.enabled = true;
    config.config_file.enabled = true;
    config
}

#[test]
fn test_project_attribution_sources() {
    let config = ParserConfig {
        project_config: Some(project_config()),
        ..ParserConfig::default()
    };
    let p = parser(config);

    let by_path = p.parse("- [ ] a", "clients/acme/notes.md", &MetadataSources::default());
    let attribution = by_path[0].project.as_ref().unwrap();
    assert_eq!(attribution.kind, AttributionKind::Path);
    assert_eq!(attribution.name, "Acme");

    let sources = MetadataSources {
        frontmatter: Some(object(json!({"project": "Beta"}))),
        project_config: Some(object(json!({"project": "Gamma"}))),
        fallback_project: None,
    };
    let by_meta = p.parse("- [ ] a", "misc/notes.md", &sources);
    assert_eq!(by_meta[0].project.as_ref().unwrap().kind, AttributionKind::Metadata);

    let sources = MetadataSources {
        project_config: Some(object(json!({"project": "Gamma"}))),
        ..MetadataSources::default()
    };
    let by_config = p.parse("- [ ] a", "misc/notes.md", &sources);
    let attribution = by_config[0].project.as_ref().unwrap();
    assert_eq!(attribution.kind, AttributionKind::Config);
    assert_eq!(attribution.name, "Gamma");
    assert!(attribution.readonly);
}

#[test]
fn test_fallback_project_used_only_without_match() {
    let config = ParserConfig {
        project_config: Some(project_config()),
        ..ParserConfig::default()
    };
    let p = parser(config);
    let fallback = ProjectAttribution::new(AttributionKind::Default, "Inbox", "caller");
    let sources = MetadataSources {
        fallback_project: Some(fallback.clone()),
        ..MetadataSources::default()
    };

    let tasks = p.parse("- [ ] a", "misc/notes.md", &sources);
    assert_eq!(tasks[0].project.as_ref(), Some(&fallback));

    let tasks = p.parse("- [ ] a", "clients/acme/x.md", &sources);
    assert_eq!(tasks[0].project.as_ref().unwrap().name, "Acme");
}
