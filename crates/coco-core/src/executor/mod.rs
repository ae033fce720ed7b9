//! Tool executor
//!
//! Every tool call an agent makes passes through here exactly once. Calls
//! that need confirmation move the workflow to
//! [`WorkflowState::ToolAwaitingConfirmation`] and wait on the
//! [`ConfirmationChannel`]; nothing runs until an explicit approve arrives.
//! A denial is a normal outcome carrying [`DENIAL_MARKER`], not an error.

mod confirm;


pub use confirm::{
    ConfirmationBroker, ConfirmationChannel, Decision, FixedConfirmation, ScriptedConfirmation,
};
#[cfg(test)]
pub use confirm::MockConfirmationChannel;

pub use crate::history::ToolStatus;

use crate::agents::AgentKind;
use crate::error::Result;
use crate::workflow::{StateHandle, WorkflowState};
use coco_tools::{RiskLevel, ToolRegistry, ToolResult, ToolRunner};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Prefix of every denial observation
pub const DENIAL_MARKER: &str = "[DENIED]";

/// A tool call proposed by an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name
    pub name: String,
    /// Arguments object
    pub arguments: serde_json::Value,
    /// Whether the call must be approved before it runs
    pub requires_confirmation: bool,
}

/// A call waiting for the operator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingToolCall {
    /// Request id
    pub id: Uuid,
    /// Requesting agent
    pub agent: AgentKind,
    /// Tool name
    pub name: String,
    /// Arguments object
    pub arguments: serde_json::Value,
    /// Tool risk level
    pub risk: RiskLevel,
}

impl PendingToolCall {
    /// Short human-readable description of what would happen
    #[must_use]
    pub fn describe(&self) -> String {
        describe_call(&self.name, &self.arguments)
    }
}

/// One-line description of a tool call, e.g. `write src/a.py (120 bytes)`
#[must_use]
pub fn describe_call(name: &str, arguments: &serde_json::Value) -> String {
    let arg = |key: &str| arguments.get(key).and_then(|v| v.as_str()).unwrap_or("?");
    match name {
        "write_file" => {
            let bytes = arguments
                .get("content")
                .and_then(|v| v.as_str())
                .map_or(0, str::len);
            format!("write {} ({bytes} bytes)", arg("path"))
        }
        "run_command" => {
            let args: Vec<&str> = arguments
                .get("args")
                .and_then(|v| v.as_array())
                .map(|a| a.iter().filter_map(|v| v.as_str()).collect())
                .unwrap_or_default();
            format!("run {} {}", arg("command"), args.join(" "))
                .trim_end()
                .to_string()
        }
        other => format!("{other} {arguments}"),
    }
}

/// How a call ended and what the agent sees
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    /// Terminal state
    pub status: ToolStatus,
    /// Text returned to the agent
    pub observation: String,
    /// Raw result when the tool ran
    pub result: Option<ToolResult>,
}

impl ExecutionOutcome {
    fn failed(observation: String) -> Self {
        Self {
            status: ToolStatus::Failed,
            observation,
            result: None,
        }
    }
}

/// Confirmation gate in front of the tool runner
#[derive(Clone)]
pub struct ToolExecutor {
    runner: ToolRunner,
}

impl ToolExecutor {
    /// Executor over a runner
    #[must_use]
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }

    /// Registered tools
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        self.runner.registry()
    }

    /// Build a call, deciding from the registry whether it needs approval
    #[must_use]
    pub fn prepare(&self, name: impl Into<String>, arguments: serde_json::Value) -> ToolCall {
        let name = name.into();
        let requires_confirmation = self.registry().requires_confirmation(&name);
        ToolCall {
            name,
            arguments,
            requires_confirmation,
        }
    }

    /// Run a call, asking `channel` first when it requires confirmation
    ///
    /// # Errors
    /// Only a confirmation channel failure is an error (the turn is
    /// aborted). Tool failures, unknown tools and denials are outcomes.
    #[instrument(skip(self, call, channel, state), fields(tool = %call.name, agent = %agent))]
    pub async fn execute(
        &self,
        call: ToolCall,
        agent: AgentKind,
        channel: &dyn ConfirmationChannel,
        state: &StateHandle,
    ) -> Result<ExecutionOutcome> {
        let Some(definition) = self.registry().get_definition(&call.name) else {
            warn!(tool = %call.name, "Unknown tool requested");
            return Ok(ExecutionOutcome::failed(format!(
                "Error: unknown tool '{}'",
                call.name
            )));
        };

        if call.requires_confirmation {
            let pending = PendingToolCall {
                id: Uuid::new_v4(),
                agent,
                name: call.name.clone(),
                arguments: call.arguments.clone(),
                risk: definition.risk_level,
            };

            state.set(WorkflowState::ToolAwaitingConfirmation);
            let decision = channel.present(&pending).await;
            state.set(WorkflowState::AgentRunning);

            match decision? {
                Decision::Approve => {
                    info!(tool = %call.name, "Tool call approved");
                }
                Decision::Deny => {
                    info!(tool = %call.name, "Tool call denied");
                    return Ok(ExecutionOutcome {
                        status: ToolStatus::Denied,
                        observation: format!(
                            "{DENIAL_MARKER} The user declined this {} call. Nothing was executed \
                             and no change was applied.",
                            call.name
                        ),
                        result: None,
                    });
                }
            }
        }

        let result = match self.runner.execute(&call.name, call.arguments).await {
            Ok(result) => result,
            Err(e) => return Ok(ExecutionOutcome::failed(format!("Error: {e}"))),
        };

        let status = if result.success {
            ToolStatus::Executed
        } else {
            ToolStatus::Failed
        };
        info!(
            tool = %call.name,
            status = %status,
            duration_ms = result.duration_ms,
            "Tool executed"
        );
        Ok(ExecutionOutcome {
            status,
            observation: result.observation(),
            result: Some(result),
        })
    }
}
