//! Runner - Tool execution with validation and a time limit
//!
//! The runner never decides whether a call may run; that is the job of the
//! confirmation gate in front of it. It only turns a named call into a
//! [`ToolResult`], converting tool errors into failed results so the agent
//! sees them as observations.

use crate::error::{Error, Result};
use crate::registry::{ToolRegistry, ToolResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, instrument, warn};

/// Configuration for the tool runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Upper bound on any single tool execution
    pub default_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(120),
        }
    }
}

impl RunnerConfig {
    /// Set the default timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }
}

/// Executes registered tools by name
#[derive(Clone)]
pub struct ToolRunner {
    registry: Arc<ToolRegistry>,
    config: RunnerConfig,
}

impl ToolRunner {
    /// Create a new tool runner
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>, config: RunnerConfig) -> Self {
        Self { registry, config }
    }

    /// Create with default configuration
    #[must_use]
    pub fn with_defaults(registry: Arc<ToolRegistry>) -> Self {
        Self::new(registry, RunnerConfig::default())
    }

    /// Get the registry
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Execute a tool by name
    ///
    /// # Errors
    /// Only [`Error::NotFound`] escapes; every other failure is a failed
    /// [`ToolResult`].
    #[instrument(skip(self, input), fields(tool = %tool_name))]
    pub async fn execute(&self, tool_name: &str, input: serde_json::Value) -> Result<ToolResult> {
        let tool = self
            .registry
            .get(tool_name)
            .ok_or_else(|| Error::NotFound(tool_name.to_string()))?;

        if let Err(e) = tool.validate_input(&input) {
            return Ok(ToolResult::failure(e.to_string(), 0));
        }

        let start = Instant::now();
        let limit = self.config.default_timeout;
        debug!(tool = %tool_name, timeout_ms = %limit.as_millis(), "Executing tool");

        let result = match timeout(limit, tool.execute(input)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                let duration = start.elapsed().as_millis() as u64;
                warn!(tool = %tool_name, error = %e, "Tool execution failed");
                ToolResult::failure(e.to_string(), duration)
            }
            Err(_) => {
                let duration = start.elapsed().as_millis() as u64;
                warn!(tool = %tool_name, timeout_ms = %limit.as_millis(), "Tool execution timed out");
                ToolResult::failure(Error::Timeout(duration).to_string(), duration)
            }
        };

        debug!(
            tool = %tool_name,
            success = %result.success,
            duration_ms = %result.duration_ms,
            "Tool execution completed"
        );
        Ok(result)
    }
}
