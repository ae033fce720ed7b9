//! Append-only JSONL history log
//!
//! One file per session under the history directory, named
//! `YYYY-MM-DD-<first 8 chars of the session id>.jsonl`. Each append is
//! flushed and synced before it returns.

use super::session::Session;
use super::turn::{Role, ToolOutcome, Turn};
use crate::agents::AgentKind;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// One line of the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Record time
    pub ts: DateTime<Utc>,
    /// Session id
    pub session: Uuid,
    /// Producer
    pub role: Role,
    /// Text
    pub content: String,
    /// Handling agent
    pub agent: Option<AgentKind>,
    /// Token estimate
    pub token_count: usize,
    /// Tool metadata on tool records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<ToolOutcome>,
    /// Event kind on system records (`session_start`, `compression`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl LogRecord {
    /// Record for a turn
    #[must_use]
    pub fn from_turn(session: Uuid, turn: &Turn) -> Self {
        Self {
            ts: turn.timestamp,
            session,
            role: turn.role,
            content: turn.content.clone(),
            agent: turn.agent,
            token_count: turn.token_count,
            tool: turn.tool.clone(),
            kind: None,
        }
    }

    /// System event record
    #[must_use]
    pub fn system(session: Uuid, kind: &str, content: impl Into<String>, token_count: usize) -> Self {
        Self {
            ts: Utc::now(),
            session,
            role: Role::System,
            content: content.into(),
            agent: None,
            token_count,
            tool: None,
            kind: Some(kind.to_string()),
        }
    }
}

/// Handle on a session's log file
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    /// Log file path for a session
    #[must_use]
    pub fn path_for(dir: &Path, session: &Session) -> PathBuf {
        let id = session.id().simple().to_string();
        dir.join(format!(
            "{}-{}.jsonl",
            session.started_at().format("%Y-%m-%d"),
            &id[..8]
        ))
    }

    /// Prepare the log for `session`, creating the directory if needed
    ///
    /// # Errors
    /// [`Error::History`] when the directory cannot be created.
    pub async fn create(dir: &Path, session: &Session) -> Result<Self> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::History(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self {
            path: Self::path_for(dir, session),
        })
    }

    /// File path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append records as one write, then sync
    ///
    /// # Errors
    /// [`Error::History`] on any I/O or serialization failure.
    pub async fn append(&self, records: &[LogRecord]) -> Result<()> {
        let mut buf = String::new();
        for record in records {
            let line = serde_json::to_string(record)
                .map_err(|e| Error::History(format!("cannot serialize record: {e}")))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| Error::History(format!("cannot open {}: {e}", self.path.display())))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| Error::History(format!("write failed: {e}")))?;
        file.flush()
            .await
            .map_err(|e| Error::History(format!("flush failed: {e}")))?;
        file.sync_data()
            .await
            .map_err(|e| Error::History(format!("sync failed: {e}")))?;
        Ok(())
    }

    /// Read every record back
    ///
    /// # Errors
    /// [`Error::History`] when the file cannot be read or a line is not a
    /// record.
    pub async fn read_all(path: &Path) -> Result<Vec<LogRecord>> {
        let text = fs::read_to_string(path)
            .await
            .map_err(|e| Error::History(format!("cannot read {}: {e}", path.display())))?;
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| Error::History(format!("corrupt history line: {e}")))
            })
            .collect()
    }
}
