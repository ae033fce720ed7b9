use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use super::config::ExecConfig;
use super::runner;

/// Tool for running an allow-listed program in the workspace
pub struct RunCommandTool {
    pub(crate) definition: ToolDefinition,
    pub(crate) config: ExecConfig,
    root: PathBuf,
}

impl RunCommandTool {
    /// Create the tool with a working directory and policy
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: ExecConfig) -> Self {
        let description = format!(
            "Run a program in the workspace root. The program and its arguments are passed \
             separately; no shell, pipes or redirection. Allowed programs: {}.",
            config.allowed_commands.join(", ")
        );
        let definition = ToolDefinition::new("run_command", description)
            .with_category(ToolCategory::Exec)
            .with_risk_level(RiskLevel::High)
            .with_parameters(serde_json::json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Program name, e.g. \"git\""
                    },
                    "args": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Arguments as separate strings, e.g. [\"status\", \"--short\"]"
                    }
                },
                "required": ["command"]
            }));

        Self {
            definition,
            config,
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for RunCommandTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let command = input
            .get("command")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .ok_or_else(|| Error::InvalidInput("Missing 'command' parameter".to_string()))?;

        if command.is_empty() || command.contains(char::is_whitespace) {
            return Err(Error::InvalidInput(
                "'command' must be a single program name; put arguments in 'args'".to_string(),
            ));
        }
        if !self.config.is_allowed(command) {
            warn!(command = %command, "Command not in allow list");
            return Err(Error::PermissionDenied(format!(
                "'{command}' is not an allowed command (allowed: {})",
                self.config.allowed_commands.join(", ")
            )));
        }

        let args: Vec<String> = match input.get("args") {
            None | Some(serde_json::Value::Null) => Vec::new(),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|v| {
                    v.as_str().map(ToString::to_string).ok_or_else(|| {
                        Error::InvalidInput("'args' must contain only strings".to_string())
                    })
                })
                .collect::<Result<_>>()?,
            Some(_) => {
                return Err(Error::InvalidInput("'args' must be an array".to_string()));
            }
        };

        let output = runner::run(
            command,
            &args,
            &self.root,
            Duration::from_secs(self.config.timeout_secs),
        )
        .await?;

        let duration = start.elapsed().as_millis() as u64;
        info!(command = %command, args = args.len(), exit_code = output.exit_code, duration_ms = duration, "Command finished");

        let body = serde_json::json!({
            "command": command,
            "args": args,
            "exit_code": output.exit_code,
            "stdout": runner::clip(&output.stdout, self.config.max_output_chars),
            "stderr": runner::clip(&output.stderr, self.config.max_output_chars),
        });

        if output.success() {
            Ok(ToolResult::success(body, duration))
        } else {
            Ok(ToolResult {
                success: false,
                output: body,
                error: Some(format!("Command exited with code {}", output.exit_code)),
                duration_ms: duration,
            })
        }
    }
}
