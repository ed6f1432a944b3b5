// File: ./src/model/mod.rs
pub mod item;
pub mod legacy;

pub use item::{
    AttributionKind, EnhancedDates, MetadataMap, ProjectAttribution, TaskMetadata, TaskRecord,
    TimeComponent, TimeField, fields,
};
pub use legacy::{LegacyDate, LegacyMetadata, LegacyTask};
