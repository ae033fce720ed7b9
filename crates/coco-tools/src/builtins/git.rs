//! Git tools - read-only repository inspection
//!
//! Both tools run `git` in the workspace root with a fixed argument list and
//! a 10 second limit.

use super::exec::runner::{self, CommandOutput};
use crate::error::Result;
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;

const GIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum commits `git_log` returns
const MAX_LOG_LIMIT: u64 = 100;

/// Maximum diff characters returned
const MAX_DIFF_CHARS: usize = 30_000;

async fn run_git(root: &Path, args: &[String]) -> Result<CommandOutput> {
    debug!(args = ?args, "Running git");
    runner::run("git", args, root, GIT_TIMEOUT).await
}

fn git_result(output: CommandOutput, what: &str, body: String, start: Instant) -> ToolResult {
    let duration = start.elapsed().as_millis() as u64;
    if output.success() {
        ToolResult::success(serde_json::Value::String(body), duration)
    } else {
        ToolResult::failure(
            format!("git {what} failed: {}", output.stderr.trim()),
            duration,
        )
    }
}

/// Tool for showing uncommitted changes
pub struct GitDiffTool {
    definition: ToolDefinition,
    root: PathBuf,
}

impl GitDiffTool {
    /// Create a diff tool for the repository at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let definition = ToolDefinition::new(
            "git_diff",
            "Show uncommitted changes in the workspace repository.",
        )
        .with_category(ToolCategory::Git)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "stat": {
                    "type": "boolean",
                    "description": "Show only a per-file summary (default: false)"
                }
            }
        }));

        Self {
            definition,
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for GitDiffTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let stat = input.get("stat").and_then(|v| v.as_bool()).unwrap_or(false);

        let mut args = vec!["diff".to_string(), "--no-color".to_string()];
        if stat {
            args.push("--stat".to_string());
        }

        let output = run_git(&self.root, &args).await?;
        let body = if output.stdout.trim().is_empty() {
            "No uncommitted changes.".to_string()
        } else {
            runner::clip(&output.stdout, MAX_DIFF_CHARS)
        };
        Ok(git_result(output, "diff", body, start))
    }
}

/// Tool for viewing recent commits
pub struct GitLogTool {
    definition: ToolDefinition,
    root: PathBuf,
}

impl GitLogTool {
    /// Create a log tool for the repository at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let definition = ToolDefinition::new(
            "git_log",
            "Show recent commits as one line each: short hash, subject, author and age.",
        )
        .with_category(ToolCategory::Git)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of commits (default: 10, max: 100)"
                }
            }
        }));

        Self {
            definition,
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for GitLogTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let limit = input
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(10)
            .clamp(1, MAX_LOG_LIMIT);

        let args = vec![
            "log".to_string(),
            "--no-color".to_string(),
            "--format=%h %s (%an, %ar)".to_string(),
            format!("-n{limit}"),
        ];

        let output = run_git(&self.root, &args).await?;
        let body = if output.stdout.trim().is_empty() {
            "No commits.".to_string()
        } else {
            output.stdout.trim_end().to_string()
        };
        Ok(git_result(output, "log", body, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definitions() {
        let diff = GitDiffTool::new("/tmp");
        assert_eq!(diff.definition().name, "git_diff");
        assert_eq!(diff.definition().risk_level, RiskLevel::Low);

        let log = GitLogTool::new("/tmp");
        assert_eq!(log.definition().name, "git_log");
        assert_eq!(log.definition().category, ToolCategory::Git);
    }

    #[tokio::test]
    async fn test_outside_repository_is_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        // Either git is missing (error) or it reports "not a git repository" (failed result)
        match GitLogTool::new(dir.path()).execute(serde_json::json!({})).await {
            Ok(result) => assert!(!result.success),
            Err(e) => assert!(e.to_string().contains("git")),
        }
    }
}
