//! Turn workflow
//!
//! ```text
//! Idle -> Routing -> AgentRunning <-> ToolAwaitingConfirmation
//!                         |
//!                         v
//!                   (commit turn) -> Compressing? -> Idle
//! ```
//!
//! One turn runs at a time. Cancelling a turn at any point before the
//! commit leaves the session exactly as it was.

mod bootstrap;
mod engine;
mod state;

#[cfg(test)]
mod tests;

pub use bootstrap::{build_engine, build_registry, open_cache, open_index};
pub use engine::{EngineStatus, TurnOutcome, TurnReport, WorkflowEngine};
pub use state::{StateHandle, WorkflowState};
