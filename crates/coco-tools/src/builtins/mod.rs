//! Builtins - the tools agents can call
//!
//! - File tools: read_file, write_file, list_directory, search_in_files
//! - Exec tool: run_command
//! - Git tools: git_diff, git_log
//! - Web tool: web_search
//! - Index tools: search_codebase, get_index_stats (only with an index)

mod exec;
mod file;
mod git;
mod index;
mod web_search;

pub use exec::{CommandOutput, ExecConfig, RunCommandTool};
pub use file::{
    is_sensitive_file, resolve_in_root, ListDirectoryTool, ReadFileTool, SearchInFilesTool,
    WriteFileTool,
};
pub use git::{GitDiffTool, GitLogTool};
pub use index::{format_chunks, IndexStatsTool, SearchCodebaseTool, DEFAULT_RESULTS};
pub use web_search::{parse_search_results, SearchResult, WebSearchTool};

use crate::registry::ToolRegistry;
use coco_index::CodeIndex;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for built-in tools
#[derive(Clone)]
pub struct BuiltinsConfig {
    /// Directory file, exec and git tools are confined to
    pub workspace_root: PathBuf,
    /// run_command policy
    pub exec: ExecConfig,
    /// Code index backing the index tools
    pub index: Option<Arc<dyn CodeIndex>>,
    /// Default `search_codebase` result count
    pub query_results: usize,
}

impl BuiltinsConfig {
    /// Defaults for a workspace root
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            exec: ExecConfig::default(),
            index: None,
            query_results: DEFAULT_RESULTS,
        }
    }

    /// Set the run_command policy
    #[must_use]
    pub fn with_exec(mut self, exec: ExecConfig) -> Self {
        self.exec = exec;
        self
    }

    /// Enable the index tools
    #[must_use]
    pub fn with_index(mut self, index: Arc<dyn CodeIndex>, query_results: usize) -> Self {
        self.index = Some(index);
        self.query_results = query_results;
        self
    }
}

/// Register all built-in tools
pub fn register_builtins(registry: &mut ToolRegistry, config: &BuiltinsConfig) {
    let root = &config.workspace_root;

    registry.register(Arc::new(ReadFileTool::new(root)));
    registry.register(Arc::new(WriteFileTool::new(root)));
    registry.register(Arc::new(ListDirectoryTool::new(root)));
    registry.register(Arc::new(SearchInFilesTool::new(root)));

    registry.register(Arc::new(RunCommandTool::new(root, config.exec.clone())));

    registry.register(Arc::new(GitDiffTool::new(root)));
    registry.register(Arc::new(GitLogTool::new(root)));

    registry.register(Arc::new(WebSearchTool::new()));

    if let Some(index) = &config.index {
        registry.register(Arc::new(SearchCodebaseTool::new(
            Arc::clone(index),
            config.query_results,
        )));
        registry.register(Arc::new(IndexStatsTool::new(Arc::clone(index))));
    }
}
