//! run_command - argument-list command execution

pub mod config;
pub mod runner;
pub mod tool;


pub use config::ExecConfig;
pub use runner::CommandOutput;
pub use tool::RunCommandTool;
