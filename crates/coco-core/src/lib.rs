//! Coco Core - turn orchestration
//!
//! This crate drives one developer turn from utterance to recorded answer:
//! - Router: picks the agent and the model tier
//! - Agents: Code, Plan, Ask and Search loops over the text tool protocol
//! - Executor: confirmation gate in front of every tool call
//! - Gateway: cached, retrying access to the LLM provider
//! - History: session turns, rolling summary and the JSONL log
//! - Compression: folds aged turns into the summary when over budget
//! - Workflow: the engine tying these together, with cancellation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agents;
pub mod cache;
pub mod compression;
pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod history;
pub mod router;
pub mod utils;
pub mod workflow;

pub use agents::{AgentKind, AgentResult, Plan, ToolCallRecord};
pub use cache::{CacheStats, ResponseCache};
pub use compression::{CompressionOutcome, CompressionPolicy, ContextCompressor};
pub use config::{coco_home, CocoConfig};
pub use error::{format_error_for_cli, Error, Result, UserFacing};
pub use executor::{
    ConfirmationBroker, ConfirmationChannel, Decision, FixedConfirmation, PendingToolCall,
    ScriptedConfirmation, ToolExecutor, DENIAL_MARKER,
};
pub use gateway::LlmGateway;
pub use history::{HistoryStore, Role, Session, ToolStatus, Turn};
pub use router::{RouteDecision, Router, TurnInput};
pub use workflow::{
    build_engine, EngineStatus, StateHandle, TurnOutcome, TurnReport, WorkflowEngine,
    WorkflowState,
};
