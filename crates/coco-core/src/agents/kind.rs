//! Agent kinds

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The closed set of agents a turn can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Reads and edits files, runs allowed commands
    Code,
    /// Produces an ordered implementation plan
    Plan,
    /// Read-only questions about the code and the session
    Ask,
    /// Web search and synthesis
    Search,
}

impl AgentKind {
    /// Every kind, in classification order
    pub const ALL: [AgentKind; 4] = [Self::Code, Self::Plan, Self::Ask, Self::Search];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Plan => "plan",
            Self::Ask => "ask",
            Self::Search => "search",
        }
    }

    /// Tools this agent may request
    #[must_use]
    pub fn tools(&self) -> &'static [&'static str] {
        match self {
            Self::Code => &[
                "read_file",
                "write_file",
                "list_directory",
                "search_in_files",
                "search_codebase",
                "get_index_stats",
                "git_diff",
                "git_log",
                "run_command",
            ],
            Self::Plan => &["search_codebase", "get_index_stats"],
            Self::Ask => &[
                "read_file",
                "list_directory",
                "search_codebase",
                "get_index_stats",
                "recall_history",
            ],
            Self::Search => &["web_search", "search_codebase", "get_index_stats"],
        }
    }

    /// Whether `tool` is in this agent's set
    #[must_use]
    pub fn allows(&self, tool: &str) -> bool {
        self.tools().contains(&tool)
    }

    /// Whether the prompt is primed with code index results
    #[must_use]
    pub fn uses_code_context(&self) -> bool {
        !matches!(self, Self::Search)
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(Self::Code),
            "plan" => Ok(Self::Plan),
            "ask" => Ok(Self::Ask),
            "search" => Ok(Self::Search),
            other => Err(format!("unknown agent '{other}'")),
        }
    }
}
