//! Session history
//!
//! [`HistoryStore`] owns the active [`Session`] and its JSONL log. A user
//! turn and everything it produced (tool observations, the agent answer)
//! are staged in a [`PendingTurn`] and committed together: the log write
//! is synced first, then the in-memory session is updated. Dropping a
//! pending turn records nothing, which is how aborted turns leave history
//! untouched.

mod log;
mod session;
mod turn;


pub use log::{HistoryLog, LogRecord};
pub use session::{Session, Summary};
pub use turn::{Role, ToolOutcome, ToolStatus, Turn};

use crate::error::Result;
use chrono::Utc;
use coco_llm::TokenCounter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turns staged for one atomic commit
#[derive(Debug, Default)]
#[must_use = "a pending turn records nothing until it is committed"]
pub struct PendingTurn {
    turns: Vec<Turn>,
}

impl PendingTurn {
    /// Empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a turn
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// Staged turns
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Whether nothing is staged
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// The active session and its durable log
pub struct HistoryStore {
    dir: PathBuf,
    session: Session,
    log: HistoryLog,
    counter: TokenCounter,
}

impl HistoryStore {
    /// Start a new session logging under `dir`
    ///
    /// # Errors
    /// Fails when the directory or the first log record cannot be written.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let session = Session::new();
        let log = HistoryLog::create(&dir, &session).await?;
        let store = Self {
            dir,
            session,
            log,
            counter: TokenCounter::new(),
        };
        store.log_event("session_start", "").await?;
        info!(session_id = %store.session.id(), path = %store.log.path().display(), "Session started");
        Ok(store)
    }

    /// The active session
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Path of the active log file
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.log.path()
    }

    /// Token counter shared with the compressor
    #[must_use]
    pub fn counter(&self) -> TokenCounter {
        self.counter
    }

    /// Write the staged turns to the log, then append them to the session
    ///
    /// # Errors
    /// [`crate::Error::History`] if the log write fails; the session is then
    /// left unchanged.
    pub async fn commit(&mut self, pending: PendingTurn) -> Result<()> {
        if pending.is_empty() {
            return Ok(());
        }

        let mut turns = pending.turns;
        for turn in &mut turns {
            turn.token_count = self.counter.count_tokens(&turn.content);
        }

        let records: Vec<LogRecord> = turns
            .iter()
            .map(|t| LogRecord::from_turn(self.session.id(), t))
            .collect();
        self.log.append(&records).await?;

        let count = turns.len();
        self.session.extend(turns);
        debug!(
            session_id = %self.session.id(),
            turns = count,
            total_tokens = self.session.total_tokens(),
            "Turns committed"
        );
        Ok(())
    }

    /// Commit a single turn
    ///
    /// # Errors
    /// See [`HistoryStore::commit`].
    pub async fn append(&mut self, turn: Turn) -> Result<()> {
        let mut pending = PendingTurn::new();
        pending.push(turn);
        self.commit(pending).await
    }

    /// Replace the oldest `folded` turns with a new rolling summary
    ///
    /// # Errors
    /// [`crate::Error::History`] if the compression record cannot be
    /// logged; the session is then left unchanged.
    pub async fn apply_summary(&mut self, folded: usize, content: String) -> Result<()> {
        let token_count = self.counter.count_tokens(&content);
        let covers_turns = self.session.summary().map_or(0, |s| s.covers_turns) + folded;

        self.log_event("compression", &content).await?;
        self.session.fold(
            folded,
            Summary {
                content,
                token_count,
                covers_turns,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// End the current session and start a fresh one with its own log
    ///
    /// # Errors
    /// Fails when the new log cannot be created.
    pub async fn reset(&mut self) -> Result<()> {
        self.close().await?;
        let session = Session::new();
        self.log = HistoryLog::create(&self.dir, &session).await?;
        self.session = session;
        self.log_event("session_start", "").await?;
        info!(session_id = %self.session.id(), "Session reset");
        Ok(())
    }

    /// Record the end of the session
    ///
    /// # Errors
    /// [`crate::Error::History`] if the record cannot be written.
    pub async fn close(&self) -> Result<()> {
        self.log_event("session_end", "").await
    }

    async fn log_event(&self, kind: &str, content: &str) -> Result<()> {
        let tokens = self.counter.count_tokens(content);
        self.log
            .append(&[LogRecord::system(self.session.id(), kind, content, tokens)])
            .await
    }
}
