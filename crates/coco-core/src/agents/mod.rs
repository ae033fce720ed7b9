//! Agents
//!
//! Each agent is the same bounded loop with a different prompt and tool
//! set: ask the model, run any tools it requests through the
//! [`ToolExecutor`](crate::executor::ToolExecutor), feed the observations
//! back, and stop at the first reply without tool calls or at
//! `max_steps`.

mod kind;
mod plan;
mod prompts;
mod protocol;
mod recall;
mod runner;

#[cfg(test)]
mod tests;

pub use kind::AgentKind;
pub use plan::{parse_plan, Complexity, Plan, PlanStep};
pub use prompts::{context_message, system_prompt, CodeContext, RECALL_TOOL};
pub use protocol::{extract_clarification, parse_reply, render_observations, ParsedReply, RequestedCall};
pub use recall::{recall, DEFAULT_RECALL_LIMIT};
pub use runner::{AgentOptions, AgentRunner, AgentTask};

use crate::history::ToolStatus;
use serde::{Deserialize, Serialize};

/// One tool call made during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Tool name
    pub name: String,
    /// Arguments as requested
    pub arguments: serde_json::Value,
    /// How it ended
    pub status: ToolStatus,
    /// What the agent was shown
    pub observation: String,
}

/// Why a run ended without an answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFailure {
    /// One-line reason
    pub message: String,
    /// Suggested fix
    pub hint: Option<String>,
}

/// Outcome of one agent run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResult {
    /// Agent that ran
    pub agent: AgentKind,
    /// Answer shown to the user
    pub text: String,
    /// Every tool call in request order, including denied and skipped ones
    pub tool_calls_made: Vec<ToolCallRecord>,
    /// Completion requests issued
    pub steps: usize,
    /// The run is over and needs no further agent steps; set on every
    /// result the runner returns, including step-limit stops and failures
    pub terminal: bool,
    /// The step limit was reached; `text` is the best partial answer
    pub partial: bool,
    /// Answered without code index context
    pub degraded: bool,
    /// Question the agent needs answered before it can continue
    pub clarification: Option<String>,
    /// Parsed plan (plan agent only)
    pub plan: Option<Plan>,
    /// Set when the provider failed
    pub failure: Option<AgentFailure>,
}

impl AgentResult {
    /// Calls that actually ran
    pub fn executed_trace(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.tool_calls_made.iter().filter(|r| r.status.ran())
    }

    /// Calls the operator declined
    pub fn denied(&self) -> impl Iterator<Item = &ToolCallRecord> {
        self.tool_calls_made
            .iter()
            .filter(|r| r.status == ToolStatus::Denied)
    }
}
