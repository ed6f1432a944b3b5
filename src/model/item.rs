// File: ./src/model/item.rs
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Raw per-task metadata: field name -> value, as extracted and inherited.
pub type MetadataMap = BTreeMap<String, String>;

/// Field names used across the extractors, the inheritance resolver and the
/// typed bundle.
pub mod fields {
    pub const DUE_DATE: &str = "dueDate";
    pub const START_DATE: &str = "startDate";
    pub const SCHEDULED_DATE: &str = "scheduledDate";
    pub const COMPLETED_DATE: &str = "completedDate";
    pub const CREATED_DATE: &str = "createdDate";
    pub const CANCELLED_DATE: &str = "cancelledDate";
    pub const PRIORITY: &str = "priority";
    pub const PROJECT: &str = "project";
    pub const CONTEXT: &str = "context";
    pub const AREA: &str = "area";
    pub const TAGS: &str = "tags";
    pub const ID: &str = "id";
    pub const DEPENDS_ON: &str = "dependsOn";
    pub const ON_COMPLETION: &str = "onCompletion";
    pub const RECURRENCE: &str = "recurrence";
    pub const REPEAT: &str = "repeat";

    pub const DATE_FIELDS: &[&str] = &[
        DUE_DATE,
        START_DATE,
        SCHEDULED_DATE,
        COMPLETED_DATE,
        CREATED_DATE,
        CANCELLED_DATE,
    ];

    pub fn is_date_field(name: &str) -> bool {
        DATE_FIELDS.contains(&name)
    }
}

// --- PROJECT ATTRIBUTION ---

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributionKind {
    Path,
    Metadata,
    Config,
    Default,
}

impl fmt::Display for AttributionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributionKind::Path => write!(f, "path"),
            AttributionKind::Metadata => write!(f, "metadata"),
            AttributionKind::Config => write!(f, "config"),
            AttributionKind::Default => write!(f, "default"),
        }
    }
}

/// Which project a task belongs to, and which mechanism decided it.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProjectAttribution {
    pub kind: AttributionKind,
    pub name: String,
    pub source: Option<String>,
    pub readonly: bool,
}

impl ProjectAttribution {
    pub fn new(kind: AttributionKind, name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            source: Some(source.into()),
            readonly: true,
        }
    }
}

// --- TIME OF DAY ---

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeField {
    StartTime,
    DueTime,
    ScheduledTime,
    EndTime,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TimeComponent {
    pub hour: u32,
    pub minute: u32,
    #[serde(default)]
    pub second: Option<u32>,
    #[serde(default)]
    pub original_text: String,
}

impl TimeComponent {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self {
            hour,
            minute,
            second: None,
            original_text: String::new(),
        }
    }

    /// `None` when the collaborator handed back an impossible time.
    pub fn to_naive_time(&self) -> Option<NaiveTime> {
        NaiveTime::from_hms_opt(self.hour, self.minute, self.second.unwrap_or(0))
    }
}

/// Dates combined with their time-of-day components.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDates {
    pub start_date_time: Option<NaiveDateTime>,
    pub due_date_time: Option<NaiveDateTime>,
    pub scheduled_date_time: Option<NaiveDateTime>,
    pub end_date_time: Option<NaiveDateTime>,
}

impl EnhancedDates {
    pub fn is_empty(&self) -> bool {
        self.start_date_time.is_none()
            && self.due_date_time.is_none()
            && self.scheduled_date_time.is_none()
            && self.end_date_time.is_none()
    }
}

// --- TASK ---

/// Typed view of the metadata map, built once per task.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskMetadata {
    pub priority: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub scheduled_date: Option<NaiveDate>,
    pub completed_date: Option<NaiveDate>,
    pub created_date: Option<NaiveDate>,
    pub cancelled_date: Option<NaiveDate>,
    #[serde(default)]
    pub time_components: BTreeMap<TimeField, TimeComponent>,
    #[serde(default)]
    pub enhanced_dates: Option<EnhancedDates>,
    pub recurrence: Option<String>,
    pub project: Option<String>,
    pub context: Option<String>,
    pub area: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    pub on_completion: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One parsed task line. Identity is `(file_path, line)`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub content: String,
    /// Canonical status name from the status mapping, if the character is mapped.
    pub status: Option<String>,
    pub raw_status: char,
    pub completed: bool,
    pub indent_level: usize,
    pub parent_id: Option<String>,
    pub children_ids: Vec<String>,
    pub metadata: MetadataMap,
    pub typed: TaskMetadata,
    pub tags: Vec<String>,
    pub comment: Option<String>,
    /// 0-based index of the task line.
    pub line: usize,
    pub line_number: usize,
    pub actual_indent: usize,
    pub heading: Option<String>,
    pub heading_level: Option<usize>,
    pub list_marker: String,
    pub file_path: String,
    pub original_markdown: String,
    pub project: Option<ProjectAttribution>,
}

impl TaskRecord {
    pub fn make_id(file_path: &str, line: usize) -> String {
        format!("{}-L{}", file_path, line)
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_id.is_some()
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_component_rejects_impossible_times() {
        assert!(TimeComponent::new(25, 0).to_naive_time().is_none());
        let mut tc = TimeComponent::new(9, 30);
        tc.second = Some(15);
        assert_eq!(tc.to_naive_time(), NaiveTime::from_hms_opt(9, 30, 15));
    }

    #[test]
    fn test_attribution_serializes_kind_lowercase() {
        let a = ProjectAttribution::new(AttributionKind::Path, "Work", "work/");
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("\"kind\":\"path\""), "{json}");
        assert!(a.readonly);
    }

    #[test]
    fn test_time_field_keys() {
        let json = serde_json::to_string(&TimeField::ScheduledTime).unwrap();
        assert_eq!(json, "\"scheduledTime\"");
    }
}
