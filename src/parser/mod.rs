// The line-scanning driver. One pass over the document; every task line is run
// through token extraction, inheritance, time merging and project attribution,
// and stitched into the hierarchy by indentation.
pub mod hierarchy;
pub mod line;
pub mod protect;
pub mod tokens;

use crate::cache::{CacheStats, DateCache};
use crate::config::ParserConfig;
use crate::inherit::{FileMetadata, Inheritance, merge_tags, parse_tags_field};
use crate::model::item::{MetadataMap, ProjectAttribution, TaskMetadata, TaskRecord, fields};
use crate::model::legacy::LegacyTask;
use crate::normalize::normalize_priority;
use crate::project::{determine_project, resolve_attribution};
use crate::time::{self, DateParts, TimeParser};
use chrono::NaiveDate;
use hierarchy::IndentStack;
use line::{TaskLine, extract_heading, extract_multiline_comment, is_fence, parse_task_line};
use std::sync::Arc;
use tokens::{Extracted, MetadataExtractor};

/// File-level inputs that accompany a document.
#[derive(Debug, Clone, Default)]
pub struct MetadataSources {
    pub frontmatter: Option<FileMetadata>,
    pub project_config: Option<FileMetadata>,
    /// Used only when no project rule matches the file.
    pub fallback_project: Option<ProjectAttribution>,
}

/// Priority on the 1-5 scale, or `None` when the stored value is unrecognized.
pub fn extract_legacy_priority(metadata: &MetadataMap) -> Option<u32> {
    metadata
        .get(fields::PRIORITY)
        .and_then(|raw| normalize_priority(raw))
}

fn non_empty(metadata: &MetadataMap, key: &str) -> Option<String> {
    metadata.get(key).filter(|v| !v.is_empty()).cloned()
}

// Per-call scratch state: heading context and the task list being built.
struct Scan<'a> {
    file_path: &'a str,
    inheritance: Inheritance<'a>,
    project: Option<ProjectAttribution>,
    heading: Option<(usize, String)>,
    stack: IndentStack,
    tasks: Vec<TaskRecord>,
}

pub struct MarkdownTaskParser {
    config: ParserConfig,
    time_parser: Option<Box<dyn TimeParser>>,
    date_cache: Arc<DateCache>,
}

impl Default for MarkdownTaskParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl MarkdownTaskParser {
    /// A parser without a time-of-day recognizer, sharing the process-wide date cache.
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            time_parser: None,
            date_cache: DateCache::global(),
        }
    }

    pub fn with_time_parser(mut self, time_parser: Box<dyn TimeParser>) -> Self {
        self.time_parser = Some(time_parser);
        self
    }

    /// Use a private cache instead of the shared one.
    pub fn with_date_cache(mut self, date_cache: Arc<DateCache>) -> Self {
        self.date_cache = date_cache;
        self
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    pub fn date_cache_stats(&self) -> CacheStats {
        self.date_cache.stats()
    }

    pub fn clear_date_cache(&self) {
        self.date_cache.clear();
    }

    /// Parse a document into task records, in source order.
    pub fn parse(&self, input: &str, file_path: &str, sources: &MetadataSources) -> Vec<TaskRecord> {
        let frontmatter = sources.frontmatter.as_ref();
        let project_data = sources.project_config.as_ref();
        let determined = determine_project(
            self.config.project_config.as_ref(),
            file_path,
            frontmatter,
            project_data,
        );

        let mut scan = Scan {
            file_path,
            inheritance: Inheritance::new(&self.config, frontmatter, project_data),
            project: resolve_attribution(determined, sources.fallback_project.as_ref()),
            heading: None,
            stack: IndentStack::new(self.config.max_stack_operations, self.config.max_stack_size),
            tasks: Vec::new(),
        };

        let lines: Vec<&str> = input.lines().collect();
        let mut in_fence = false;
        let mut iterations = 0;
        let mut i = 0;

        while i < lines.len() {
            iterations += 1;
            if iterations > self.config.max_parse_iterations {
                log::warn!(
                    "Maximum parse iterations reached in '{}', stopping at line {}",
                    file_path,
                    i
                );
                break;
            }

            let line = lines[i];
            if is_fence(line) {
                in_fence = !in_fence;
                i += 1;
                continue;
            }
            if in_fence {
                i += 1;
                continue;
            }
            if self.config.parse_headings
                && let Some(heading) = extract_heading(line)
            {
                scan.heading = Some(heading);
                i += 1;
                continue;
            }

            if let Some(task_line) = parse_task_line(line) {
                let mut task = self.build_task(&scan, &task_line, line, i);
                if self.config.parse_comments && i + 1 < lines.len() {
                    let (comment, consumed) =
                        extract_multiline_comment(&lines, i + 1, task_line.actual_spaces);
                    task.comment = comment;
                    i += consumed;
                }

                if let Some(parent_id) = &task.parent_id
                    && let Some(parent) = scan.tasks.iter_mut().rev().find(|t| &t.id == parent_id)
                {
                    parent.children_ids.push(task.id.clone());
                }
                scan.stack
                    .push(task.id.clone(), task.indent_level, task.actual_indent);
                scan.tasks.push(task);
            }
            i += 1;
        }

        log::debug!("Parsed {} tasks from '{}'", scan.tasks.len(), file_path);
        scan.tasks
    }

    fn build_task(
        &self,
        scan: &Scan<'_>,
        task_line: &TaskLine<'_>,
        line: &str,
        index: usize,
    ) -> TaskRecord {
        let id = TaskRecord::make_id(scan.file_path, index);
        let (parent_id, indent_level) = scan.stack.find_parent(task_line.actual_spaces);
        let raw_status = task_line.raw_status;

        let Extracted {
            content,
            metadata,
            tags,
        } = self.extract_metadata_and_tags(task_line.content);
        let metadata = scan.inheritance.apply(&metadata, parent_id.is_some());

        let tags = match metadata.get(fields::TAGS) {
            Some(raw) if !raw.is_empty() => merge_tags(&tags, &parse_tags_field(Some(raw))),
            _ => tags,
        };
        let typed = self.typed_metadata(&metadata, &tags, task_line.content);

        TaskRecord {
            id,
            content,
            status: self.config.status_name(raw_status).map(str::to_string),
            raw_status,
            completed: raw_status.eq_ignore_ascii_case(&'x'),
            indent_level,
            parent_id,
            children_ids: Vec::new(),
            metadata,
            typed,
            tags,
            comment: None,
            line: index,
            line_number: index + 1,
            actual_indent: task_line.actual_spaces,
            heading: scan.heading.as_ref().map(|(_, text)| text.clone()),
            heading_level: scan.heading.as_ref().map(|(level, _)| *level),
            list_marker: task_line.list_marker.to_string(),
            file_path: scan.file_path.to_string(),
            original_markdown: line.to_string(),
            project: scan.project.clone(),
        }
    }

    /// Strip inline metadata and tags from a task's text.
    pub fn extract_metadata_and_tags(&self, content: &str) -> Extracted {
        MetadataExtractor::new(&self.config).extract(content)
    }

    /// A date field parsed through the date cache.
    pub fn extract_legacy_date(&self, metadata: &MetadataMap, key: &str) -> Option<NaiveDate> {
        let raw = metadata.get(key).filter(|v| !v.is_empty())?;
        self.date_cache
            .get_or_parse(raw, &self.config.custom_date_formats)
    }

    fn typed_metadata(&self, metadata: &MetadataMap, tags: &[String], raw_content: &str) -> TaskMetadata {
        let date = |key: &str| self.extract_legacy_date(metadata, key);
        let mut typed = TaskMetadata {
            priority: extract_legacy_priority(metadata),
            start_date: date(fields::START_DATE),
            due_date: date(fields::DUE_DATE),
            scheduled_date: date(fields::SCHEDULED_DATE),
            completed_date: date(fields::COMPLETED_DATE),
            created_date: date(fields::CREATED_DATE),
            cancelled_date: date(fields::CANCELLED_DATE),
            recurrence: non_empty(metadata, fields::RECURRENCE)
                .or_else(|| non_empty(metadata, fields::REPEAT)),
            project: non_empty(metadata, fields::PROJECT),
            context: non_empty(metadata, fields::CONTEXT),
            area: non_empty(metadata, fields::AREA),
            id: non_empty(metadata, fields::ID),
            depends_on: metadata
                .get(fields::DEPENDS_ON)
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|id| !id.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            on_completion: non_empty(metadata, fields::ON_COMPLETION),
            tags: tags.to_vec(),
            ..TaskMetadata::default()
        };

        if let Some(time_parser) = &self.time_parser {
            let components = time::request_components(time_parser.as_ref(), raw_content);
            if !components.is_empty() {
                let dates = DateParts {
                    start: typed.start_date,
                    due: typed.due_date,
                    scheduled: typed.scheduled_date,
                };
                typed.enhanced_dates = time::combine(dates, &components);
                typed.time_components = components;
            }
        }
        typed
    }

    /// [`parse`](Self::parse), projected to the flattened legacy shape.
    pub fn parse_legacy(
        &self,
        input: &str,
        file_path: &str,
        sources: &MetadataSources,
    ) -> Vec<LegacyTask> {
        self.parse(input, file_path, sources)
            .iter()
            .map(LegacyTask::from)
            .collect()
    }

    /// Parse one line as if it sat at `line_number` (0-based) of `file_path`.
    pub fn parse_task(&self, line: &str, file_path: &str, line_number: usize) -> Option<LegacyTask> {
        let mut task = self
            .parse(line, file_path, &MetadataSources::default())
            .into_iter()
            .next()?;
        task.id = TaskRecord::make_id(file_path, line_number);
        task.line = line_number;
        task.line_number = line_number + 1;
        Some(LegacyTask::from(task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::legacy::LegacyDate;
    use crate::time::ClockTimeParser;

    fn parser() -> MarkdownTaskParser {
        MarkdownTaskParser::default().with_date_cache(Arc::new(DateCache::default()))
    }

    fn parse(input: &str) -> Vec<TaskRecord> {
        parser().parse(input, "notes/today.md", &MetadataSources::default())
    }

    #[test]
    fn test_single_task_fields() {
        let tasks = parse("- [ ] Buy milk 📅 2025-06-19 #errand");
        assert_eq!(tasks.len(), 1);
        let t = &tasks[0];
        assert_eq!(t.id, "notes/today.md-L0");
        assert_eq!(t.content, "Buy milk");
        assert_eq!(t.status.as_deref(), Some("TODO"));
        assert!(!t.completed);
        assert_eq!(t.list_marker, "-");
        assert_eq!(t.tags, vec!["#errand"]);
        assert_eq!(t.typed.due_date, NaiveDate::from_ymd_opt(2025, 6, 19));
        assert_eq!(t.original_markdown, "- [ ] Buy milk 📅 2025-06-19 #errand");
    }

    #[test]
    fn test_completion_flag_and_unmapped_status() {
        let tasks = parse("- [X] shout\n- [?] unsure\n- [/] going");
        assert!(tasks[0].completed);
        assert_eq!(tasks[0].status, None);
        assert_eq!(tasks[1].status, None);
        assert!(!tasks[1].completed);
        assert_eq!(tasks[2].status.as_deref(), Some("IN_PROGRESS"));
    }

    #[test]
    fn test_fenced_tasks_are_skipped() {
        let tasks = parse("```\n- [ ] hidden\n```\n- [ ] shown\n~~~\n- [ ] also hidden");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].content, "shown");
        assert_eq!(tasks[0].line, 3);
    }

    #[test]
    fn test_heading_context() {
        let tasks = parse("- [ ] before\n## Inbox\n- [ ] after\n# Done\n- [x] last");
        assert_eq!(tasks[0].heading, None);
        assert_eq!(tasks[1].heading.as_deref(), Some("Inbox"));
        assert_eq!(tasks[1].heading_level, Some(2));
        assert_eq!(tasks[2].heading.as_deref(), Some("Done"));
    }

    #[test]
    fn test_hierarchy_and_children() {
        let input = "- [ ] a\n  - [ ] b\n    - [ ] c\n  - [ ] d\n- [ ] e";
        let tasks = parse(input);
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(tasks[1].parent_id.as_deref(), Some(ids[0]));
        assert_eq!(tasks[2].parent_id.as_deref(), Some(ids[1]));
        assert_eq!(tasks[3].parent_id.as_deref(), Some(ids[0]));
        assert_eq!(tasks[4].parent_id, None);
        assert_eq!(tasks[0].children_ids, vec![ids[1], ids[3]]);
        assert_eq!(
            tasks.iter().map(|t| t.indent_level).collect::<Vec<_>>(),
            vec![0, 1, 2, 1, 0]
        );
    }

    #[test]
    fn test_comments_are_consumed() {
        let tasks = parse("- [ ] a\n  note one\n  note two\n- [ ] b");
        assert_eq!(tasks[0].comment.as_deref(), Some("note one\nnote two"));
        assert_eq!(tasks[1].line, 3);
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_comments_disabled() {
        let config = ParserConfig {
            parse_comments: false,
            ..ParserConfig::default()
        };
        let p = MarkdownTaskParser::new(config).with_date_cache(Arc::new(DateCache::default()));
        let tasks = p.parse("- [ ] a\n  note", "f.md", &MetadataSources::default());
        assert_eq!(tasks[0].comment, None);
    }

    #[test]
    fn test_parse_iteration_cap() {
        let config = ParserConfig {
            max_parse_iterations: 2,
            ..ParserConfig::default()
        };
        let p = MarkdownTaskParser::new(config).with_date_cache(Arc::new(DateCache::default()));
        let tasks = p.parse("- [ ] a\n- [ ] b\n- [ ] c", "f.md", &MetadataSources::default());
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn test_time_parser_enriches_dates() {
        let p = parser().with_time_parser(Box::new(ClockTimeParser::new()));
        let tasks = p.parse(
            "- [ ] Dentist 📅 2025-06-19 14:30",
            "f.md",
            &MetadataSources::default(),
        );
        let typed = &tasks[0].typed;
        let due = typed.enhanced_dates.as_ref().and_then(|e| e.due_date_time);
        assert_eq!(due.map(|d| d.to_string()).as_deref(), Some("2025-06-19 14:30:00"));
    }

    #[test]
    fn test_recurrence_falls_back_to_repeat() {
        let tasks = parse("- [ ] water 🔁 every week");
        assert_eq!(tasks[0].typed.recurrence.as_deref(), Some("every week"));
    }

    #[test]
    fn test_parse_task_rewrites_position() {
        let legacy = parser().parse_task("- [x] done ⏫", "a.md", 7).unwrap();
        assert_eq!(legacy.id, "a.md-L7");
        assert_eq!(legacy.line, 7);
        assert_eq!(legacy.status, "x");
        assert_eq!(legacy.metadata.priority.as_deref(), Some("4"));
        assert!(parser().parse_task("not a task", "a.md", 0).is_none());
    }

    #[test]
    fn test_fence_inside_notes_still_toggles() {
        let input = "- [ ] a\n  note\n  ```\n  - [ ] hidden\n  ```\n- [ ] after fence";
        let tasks = parse(input);
        let contents: Vec<&str> = tasks.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["a", "after fence"]);
        assert_eq!(tasks[0].comment.as_deref(), Some("note"));
        assert_eq!(tasks[1].line, 5);

        let tasks = parse("- [ ] a\n  ~~~\n  - [ ] hidden\n  ~~~\n- [ ] b");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].content, "b");
    }

    #[test]
    fn test_large_numeric_priority_passes_through() {
        let tasks = parse("- [ ] a [priority:: 300]\n- [ ] b [priority:: 10]");
        assert_eq!(tasks[0].typed.priority, Some(300));
        assert_eq!(tasks[1].typed.priority, Some(10));
    }

    #[test]
    fn test_legacy_keeps_unparseable_dates_as_text() {
        let legacy = parser().parse_legacy(
            "- [ ] x [due:: someday] [start:: 2025-06-19]",
            "f.md",
            &MetadataSources::default(),
        );
        let metadata = &legacy[0].metadata;
        assert_eq!(metadata.due_date, Some(LegacyDate::Raw("someday".to_string())));
        assert!(matches!(metadata.start_date, Some(LegacyDate::Millis(_))));
        assert_eq!(metadata.scheduled_date, None);

        let json = serde_json::to_value(&legacy[0]).unwrap();
        assert_eq!(json["metadata"]["dueDate"], "someday");
        assert!(json["metadata"]["startDate"].is_i64());
    }
}
