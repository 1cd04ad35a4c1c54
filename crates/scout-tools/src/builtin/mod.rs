//! Built-in tools for Scout research sessions.

mod extract_source;
mod read_file;
mod web_search;
mod write_file;

pub use extract_source::ExtractSourceTool;
pub use read_file::ReadFileTool;
pub use web_search::{WebSearchTool, MAX_LIMIT as MAX_SEARCH_LIMIT};
pub use write_file::WriteFileTool;
