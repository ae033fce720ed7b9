//! Coco Tools - tool registry and built-in tools
//!
//! - Registry: tool registration, lookup and the confirmation policy
//! - Runner: validated, time-limited execution by name
//! - Builtins: file, command, git, web and code index tools
//!
//! File, command and git tools are confined to one workspace root.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builtins;
pub mod error;
pub mod registry;
pub mod runner;

pub use builtins::{register_builtins, BuiltinsConfig, ExecConfig};
pub use error::{Error, Result};
pub use registry::{
    ConfirmationPolicy, RiskLevel, Tool, ToolCategory, ToolDefinition, ToolRegistry, ToolResult,
};
pub use runner::{RunnerConfig, ToolRunner};
