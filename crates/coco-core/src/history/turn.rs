//! Turns

use crate::agents::AgentKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operator input
    User,
    /// Agent answer
    Agent,
    /// Tool observation
    Tool,
    /// Session bookkeeping
    System,
}

impl Role {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Agent => "agent",
            Self::Tool => "tool",
            Self::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal state of a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    /// Ran and succeeded
    Executed,
    /// Ran (or was rejected before running) and failed
    Failed,
    /// The operator declined it
    Denied,
    /// Not run because an earlier call in the same response changed state
    Skipped,
}

impl ToolStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Executed => "executed",
            Self::Failed => "failed",
            Self::Denied => "denied",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the call actually ran
    #[must_use]
    pub fn ran(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed)
    }
}

impl std::fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tool metadata on a tool turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// Tool name
    pub name: String,
    /// How the call ended
    pub status: ToolStatus,
}

/// One recorded unit of conversation, immutable once appended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Turn id
    pub id: Uuid,
    /// Producer
    pub role: Role,
    /// Text
    pub content: String,
    /// Agent that produced or handled the turn
    pub agent: Option<AgentKind>,
    /// Creation time
    pub timestamp: DateTime<Utc>,
    /// Token estimate of `content`
    pub token_count: usize,
    /// Present on tool turns
    pub tool: Option<ToolOutcome>,
}

impl Turn {
    /// Create a turn; the token count is filled in when it is staged
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            agent: None,
            timestamp: Utc::now(),
            token_count: 0,
            tool: None,
        }
    }

    /// Operator input
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Agent answer
    #[must_use]
    pub fn agent(kind: AgentKind, content: impl Into<String>) -> Self {
        Self::new(Role::Agent, content).with_agent(kind)
    }

    /// Tool observation
    #[must_use]
    pub fn tool(name: impl Into<String>, status: ToolStatus, content: impl Into<String>) -> Self {
        let mut turn = Self::new(Role::Tool, content);
        turn.tool = Some(ToolOutcome {
            name: name.into(),
            status,
        });
        turn
    }

    /// Attach the handling agent
    #[must_use]
    pub fn with_agent(mut self, kind: AgentKind) -> Self {
        self.agent = Some(kind);
        self
    }

    /// One-line rendering used in prompts and summaries
    #[must_use]
    pub fn transcript_line(&self) -> String {
        let speaker = match (&self.role, &self.agent, &self.tool) {
            (Role::Tool, _, Some(tool)) => format!("tool:{} ({})", tool.name, tool.status),
            (Role::Agent, Some(kind), _) => format!("agent:{kind}"),
            (role, _, _) => role.to_string(),
        };
        format!("[{speaker}] {}", self.content)
    }
}
