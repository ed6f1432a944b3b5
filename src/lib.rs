// Crate root library declaration and module exports.
pub mod cache;
pub mod config;
pub mod inherit;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod project;
pub mod time;

pub use config::ParserConfig;
pub use model::{LegacyTask, TaskRecord};
pub use parser::{MarkdownTaskParser, MetadataSources};
