//! Workflow states

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Where the engine is within a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Waiting for input
    Idle,
    /// Choosing agent and tier
    Routing,
    /// Agent loop running
    AgentRunning,
    /// Suspended on a confirmation request
    ToolAwaitingConfirmation,
    /// Folding old history into the summary
    Compressing,
}

impl WorkflowState {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Routing => "routing",
            Self::AgentRunning => "agent_running",
            Self::ToolAwaitingConfirmation => "tool_awaiting_confirmation",
            Self::Compressing => "compressing",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, observable current state
#[derive(Debug, Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<WorkflowState>>,
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl StateHandle {
    /// Handle starting in [`WorkflowState::Idle`]
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(WorkflowState::Idle);
        Self { tx: Arc::new(tx) }
    }

    /// Move to `state`
    pub fn set(&self, state: WorkflowState) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "Workflow state changed");
        }
    }

    /// Current state
    #[must_use]
    pub fn get(&self) -> WorkflowState {
        *self.tx.borrow()
    }

    /// Receiver notified on every change
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkflowState> {
        self.tx.subscribe()
    }
}
