// Time-of-day components and their merge into date fields.
pub mod clock;

pub use clock::ClockTimeParser;

use crate::model::item::{EnhancedDates, TimeComponent, TimeField};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

pub type TimeComponents = BTreeMap<TimeField, TimeComponent>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeParseResult {
    pub time_components: TimeComponents,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Recognizes times of day in free text. Implementations are free to be as
/// clever as they like; the parser only consumes the named components.
pub trait TimeParser: Send + Sync {
    fn parse_time_components(&self, text: &str) -> anyhow::Result<TimeParseResult>;
}

/// Ask `parser` for components. Failures are logged and yield nothing.
pub fn request_components(parser: &dyn TimeParser, text: &str) -> TimeComponents {
    match parser.parse_time_components(text) {
        Ok(result) => {
            if !result.warnings.is_empty() {
                log::warn!("Time parsing warnings for '{}': {:?}", text, result.warnings);
            }
            if !result.errors.is_empty() {
                log::warn!("Time parsing errors for '{}': {:?}", text, result.errors);
            }
            result.time_components
        }
        Err(e) => {
            log::warn!(
                "Time parser failed on '{}', continuing without time components: {:#}",
                text,
                e
            );
            TimeComponents::new()
        }
    }
}

/// The date fields a time of day can attach to.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateParts {
    pub start: Option<NaiveDate>,
    pub due: Option<NaiveDate>,
    pub scheduled: Option<NaiveDate>,
}

fn at(date: Option<NaiveDate>, component: Option<&TimeComponent>) -> Option<NaiveDateTime> {
    Some(date?.and_time(component?.to_naive_time()?))
}

/// Combine dates with time components.
///
/// A due date without a due time borrows the scheduled time and vice versa.
/// An end time is anchored to the start date.
pub fn combine(dates: DateParts, components: &TimeComponents) -> Option<EnhancedDates> {
    let get = |field| components.get(&field);
    let due_time = get(TimeField::DueTime).or_else(|| get(TimeField::ScheduledTime));
    let scheduled_time = get(TimeField::ScheduledTime).or_else(|| get(TimeField::DueTime));

    let combined = EnhancedDates {
        start_date_time: at(dates.start, get(TimeField::StartTime)),
        due_date_time: at(dates.due, due_time),
        scheduled_date_time: at(dates.scheduled, scheduled_time),
        end_date_time: at(dates.start, get(TimeField::EndTime)),
    };
    (!combined.is_empty()).then_some(combined)
}
