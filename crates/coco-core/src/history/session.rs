//! Session state

use super::turn::Turn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Rolling summary of turns folded out of the session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Summary text
    pub content: String,
    /// Token estimate of `content`
    pub token_count: usize,
    /// Turns folded into this summary over the session's lifetime
    pub covers_turns: usize,
    /// Last compression time
    pub updated_at: DateTime<Utc>,
}

/// Ordered turns plus the rolling summary
///
/// `total_tokens` is derived from the turns and the summary after every
/// mutation; nothing adjusts it incrementally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    turns: Vec<Turn>,
    summary: Option<Summary>,
    total_tokens: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Empty session with a fresh id
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
            summary: None,
            total_tokens: 0,
        }
    }

    /// Session id
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Creation time
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Verbatim turns, oldest first
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Rolling summary, if any compression has run
    #[must_use]
    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    /// Tokens in verbatim turns plus the summary
    #[must_use]
    pub fn total_tokens(&self) -> usize {
        self.total_tokens
    }

    /// The last `n` verbatim turns
    #[must_use]
    pub fn recent(&self, n: usize) -> &[Turn] {
        &self.turns[self.turns.len().saturating_sub(n)..]
    }

    pub(crate) fn extend(&mut self, turns: Vec<Turn>) {
        self.turns.extend(turns);
        self.recompute();
    }

    /// Replace the oldest `folded` turns with `summary`
    pub(crate) fn fold(&mut self, folded: usize, summary: Summary) {
        let folded = folded.min(self.turns.len());
        self.turns.drain(..folded);
        self.summary = Some(summary);
        self.recompute();
    }

    fn recompute(&mut self) {
        self.total_tokens = self.turns.iter().map(|t| t.token_count).sum::<usize>()
            + self.summary.as_ref().map_or(0, |s| s.token_count);
    }
}
