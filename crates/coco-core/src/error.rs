//! Error types for coco-core
//!
//! The variants follow the failure taxonomy of a turn. Only some of them
//! ever end a turn: tool failures, denials, index outages and compression
//! failures are absorbed where they happen and surface as observations,
//! flags or log lines.

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// LLM provider failure (retryable ones have already been retried)
    #[error("provider error: {0}")]
    Provider(#[from] coco_llm::Error),

    /// Tool could not be executed
    #[error("tool error: {0}")]
    ToolExecution(#[from] coco_tools::Error),

    /// No usable code index
    #[error("code index unavailable: {0}")]
    IndexUnavailable(String),

    /// Other code index failure
    #[error("index error: {0}")]
    Index(#[from] coco_index::Error),

    /// Summarization pass failed
    #[error("compression failed: {0}")]
    Compression(String),

    /// History log could not be written or read
    #[error("history error: {0}")]
    History(String),

    /// Response cache storage failure
    #[error("cache error: {0}")]
    Cache(String),

    /// Turn aborted (user cancel or confirmation channel closed)
    #[error("aborted: {0}")]
    Aborted(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error (serialization, task join, etc.)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// One-line message and optional hint for showing an error to the operator
pub trait UserFacing {
    /// Short description of what went wrong
    fn user_message(&self) -> String;

    /// What the operator can do about it
    fn hint(&self) -> Option<String>;
}

impl UserFacing for Error {
    fn user_message(&self) -> String {
        match self {
            Error::Provider(coco_llm::Error::Auth(_)) => {
                "The model provider rejected the API key.".to_string()
            }
            Error::Provider(coco_llm::Error::NotConfigured(what)) => {
                format!("The model provider is not configured: {what}")
            }
            Error::Provider(e) if e.is_retryable() => {
                format!("The model provider is unavailable right now ({e}).")
            }
            Error::Provider(e) => format!("The model provider refused the request: {e}"),
            Error::ToolExecution(e) => format!("A tool failed: {e}"),
            Error::IndexUnavailable(_) => "The code index is not available.".to_string(),
            Error::Index(e) => format!("Code index error: {e}"),
            Error::Compression(msg) => format!("History compression failed: {msg}"),
            Error::History(msg) => format!("Could not write the history log: {msg}"),
            Error::Cache(msg) => format!("Response cache error: {msg}"),
            Error::Aborted(msg) => format!("Turn aborted: {msg}"),
            Error::Config(msg) => format!("Configuration error: {msg}"),
            Error::Internal(msg) => format!("Internal error: {msg}"),
        }
    }

    fn hint(&self) -> Option<String> {
        match self {
            Error::Provider(coco_llm::Error::Auth(_) | coco_llm::Error::NotConfigured(_)) => {
                Some("Set ANTHROPIC_API_KEY in your environment or .env file.".to_string())
            }
            Error::Provider(e) if e.is_retryable() => {
                Some("Wait a moment and send the request again.".to_string())
            }
            Error::IndexUnavailable(_) => Some("Run /index to build the code index.".to_string()),
            Error::History(_) => Some("Check that ~/.coco/history is writable.".to_string()),
            Error::Config(_) => Some("Run /setup or edit the .coco file.".to_string()),
            _ => None,
        }
    }
}

/// Format an error for the terminal: message, then hint on its own line
#[must_use]
pub fn format_error_for_cli(error: &Error) -> String {
    match error.hint() {
        Some(hint) => format!("{}\n  hint: {hint}", error.user_message()),
        None => error.user_message(),
    }
}
