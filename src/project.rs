// Which project a file's tasks belong to.
use crate::config::ProjectConfig;
use crate::inherit::FileMetadata;
use crate::model::item::{AttributionKind, ProjectAttribution};
use serde_json::Value;

/// First match among path rules, the frontmatter key and the project config
/// file. `None` when enhanced project detection is off or nothing matched.
pub fn determine_project(
    config: Option<&ProjectConfig>,
    file_path: &str,
    frontmatter: Option<&FileMetadata>,
    project_data: Option<&FileMetadata>,
) -> Option<ProjectAttribution> {
    let config = config.filter(|c| c.enable_enhanced_project)?;

    if let Some(mapping) = config
        .path_mappings
        .iter()
        .find(|m| m.enabled && file_path.contains(&m.path_pattern))
    {
        return Some(ProjectAttribution::new(
            AttributionKind::Path,
            &mapping.project_name,
            &mapping.path_pattern,
        ));
    }

    if config.metadata_config.enabled {
        let key = &config.metadata_config.metadata_key;
        if let Some(name) = string_field(frontmatter, key) {
            return Some(ProjectAttribution::new(AttributionKind::Metadata, name, key));
        }
    }

    if config.config_file.enabled
        && let Some(name) = string_field(project_data, "project")
    {
        return Some(ProjectAttribution::new(
            AttributionKind::Config,
            name,
            &config.config_file.file_name,
        ));
    }

    None
}

fn string_field<'a>(data: Option<&'a FileMetadata>, key: &str) -> Option<&'a str> {
    match data?.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// A freshly determined attribution wins over one supplied by the caller.
pub fn resolve_attribution(
    determined: Option<ProjectAttribution>,
    fallback: Option<&ProjectAttribution>,
) -> Option<ProjectAttribution> {
    determined.or_else(|| fallback.cloned())
}
