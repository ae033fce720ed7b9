//! File tools - read, write, list and search inside the workspace root

pub mod list;
pub mod read;
pub mod search;
pub mod security;
pub mod write;

pub use list::ListDirectoryTool;
pub use read::ReadFileTool;
pub use search::SearchInFilesTool;
pub use write::WriteFileTool;

pub use security::{is_sensitive_file, resolve_in_root};
