// Flattened task shape for consumers that predate TaskRecord.
//
// Everything here is derived from a finished TaskRecord in one step; nothing
// in the parse pipeline reads or writes these fields.
use crate::model::item::{fields, ProjectAttribution, TaskRecord};
use chrono::{Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// A legacy date: epoch milliseconds when the value parsed, else the raw text.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LegacyDate {
    Millis(i64),
    Raw(String),
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMetadata {
    pub tags: Vec<String>,
    /// Normalized integer when available, else the raw stored value.
    pub priority: Option<String>,
    pub start_date: Option<LegacyDate>,
    pub due_date: Option<LegacyDate>,
    pub scheduled_date: Option<LegacyDate>,
    pub completed_date: Option<LegacyDate>,
    pub created_date: Option<LegacyDate>,
    pub cancelled_date: Option<String>,
    pub recurrence: Option<String>,
    pub project: Option<String>,
    pub context: Option<String>,
    pub area: Option<String>,
    pub id: Option<String>,
    pub depends_on: Option<Vec<String>>,
    pub on_completion: Option<String>,
    pub children: Vec<String>,
    pub heading: Vec<String>,
    pub parent: Option<String>,
    pub tg_project: Option<ProjectAttribution>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTask {
    pub id: String,
    pub content: String,
    pub file_path: String,
    pub line: usize,
    pub completed: bool,
    /// The raw checkbox character.
    pub status: String,
    pub original_markdown: String,
    pub children: Vec<String>,
    pub metadata: LegacyMetadata,
}

/// Milliseconds since the epoch at local midnight of `date`.
pub fn local_midnight_millis(date: NaiveDate) -> Option<i64> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    Local
        .from_local_datetime(&midnight)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

impl From<&TaskRecord> for LegacyTask {
    fn from(task: &TaskRecord) -> Self {
        let typed = &task.typed;
        let raw = |key: &str| task.metadata_value(key).map(str::to_string);
        let date = |parsed: Option<NaiveDate>, key: &str| {
            parsed
                .and_then(local_midnight_millis)
                .map(LegacyDate::Millis)
                .or_else(|| raw(key).map(LegacyDate::Raw))
        };

        let metadata = LegacyMetadata {
            tags: task.tags.clone(),
            priority: typed
                .priority
                .map(|p| p.to_string())
                .or_else(|| raw(fields::PRIORITY)),
            start_date: date(typed.start_date, fields::START_DATE),
            due_date: date(typed.due_date, fields::DUE_DATE),
            scheduled_date: date(typed.scheduled_date, fields::SCHEDULED_DATE),
            completed_date: date(typed.completed_date, fields::COMPLETED_DATE),
            created_date: date(typed.created_date, fields::CREATED_DATE),
            cancelled_date: raw(fields::CANCELLED_DATE),
            recurrence: typed.recurrence.clone(),
            project: typed.project.clone(),
            context: typed.context.clone(),
            area: typed.area.clone(),
            id: typed.id.clone(),
            depends_on: (!typed.depends_on.is_empty()).then(|| typed.depends_on.clone()),
            on_completion: typed.on_completion.clone(),
            children: task.children_ids.clone(),
            heading: task.heading.iter().cloned().collect(),
            parent: task.parent_id.clone(),
            tg_project: task.project.clone(),
        };

        LegacyTask {
            id: task.id.clone(),
            content: task.content.clone(),
            file_path: task.file_path.clone(),
            line: task.line,
            completed: task.completed,
            status: task.raw_status.to_string(),
            original_markdown: task.original_markdown.clone(),
            children: task.children_ids.clone(),
            metadata,
        }
    }
}

impl From<TaskRecord> for LegacyTask {
    fn from(task: TaskRecord) -> Self {
        LegacyTask::from(&task)
    }
}
