//! Context compression
//!
//! When a session's token total crosses the budget, every turn older than
//! the last `keep_recent` is folded, together with the previous summary,
//! into a new rolling summary by one simple-tier completion. The recent
//! tail is never touched. A session with nothing old enough to fold is left
//! alone, so repeated passes cannot keep rewriting the summary.

use crate::error::{Error, Result};
use crate::gateway::LlmGateway;
use crate::history::{HistoryStore, Session, Turn};
use coco_llm::{CompletionParams, Message, ModelTier, TokenCounter};
use tracing::{info, instrument, warn};

const SUMMARY_INSTRUCTIONS: &str = "You maintain the running summary of a developer's \
session with a coding assistant. Merge the previous summary and the new turns into one \
updated summary. Keep: decisions made, file paths read or changed, commands run and their \
outcome, changes that were denied, and open questions. Drop pleasantries and repeated \
content. Write plain prose or short bullet points, no preamble.";

/// Per-turn cap inside the summarization prompt
const TURN_TOKEN_CAP: usize = 800;

/// Budget and window sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionPolicy {
    /// Session token budget
    pub budget: usize,
    /// Turns always kept verbatim
    pub keep_recent: usize,
    /// Upper bound on the summary
    pub summary_max_tokens: usize,
}

impl Default for CompressionPolicy {
    fn default() -> Self {
        Self {
            budget: 4000,
            keep_recent: 4,
            summary_max_tokens: 512,
        }
    }
}

/// What a compression pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// Session was within budget
    WithinBudget,
    /// Over budget, but only the protected tail remains
    NothingToFold {
        /// Session total
        total_tokens: usize,
    },
    /// Old turns were folded into the summary
    Compressed {
        /// Turns folded
        folded: usize,
        /// Total before the pass
        before: usize,
        /// Total after the pass
        after: usize,
    },
}

impl CompressionOutcome {
    /// Whether the session changed
    #[must_use]
    pub fn compressed(&self) -> bool {
        matches!(self, Self::Compressed { .. })
    }
}

/// Folds aged turns into the rolling summary
#[derive(Debug, Clone)]
pub struct ContextCompressor {
    policy: CompressionPolicy,
    counter: TokenCounter,
}

impl ContextCompressor {
    /// Create a compressor
    #[must_use]
    pub fn new(policy: CompressionPolicy) -> Self {
        Self {
            policy,
            counter: TokenCounter::new(),
        }
    }

    /// Active policy
    #[must_use]
    pub fn policy(&self) -> CompressionPolicy {
        self.policy
    }

    /// Whether `session` is over budget
    #[must_use]
    pub fn needs_compression(&self, session: &Session) -> bool {
        session.total_tokens() > self.policy.budget
    }

    /// Compress the active session if it is over budget
    ///
    /// # Errors
    /// [`Error::Compression`] when the summary call fails or the result
    /// cannot be recorded. The session is unchanged in that case.
    #[instrument(skip(self, history, gateway), fields(session_id = %history.session().id()))]
    pub async fn maybe_compress(
        &self,
        history: &mut HistoryStore,
        gateway: &LlmGateway,
    ) -> Result<CompressionOutcome> {
        let session = history.session();
        let before = session.total_tokens();
        if before <= self.policy.budget {
            return Ok(CompressionOutcome::WithinBudget);
        }

        let fold = session.turns().len().saturating_sub(self.policy.keep_recent);
        if fold == 0 {
            warn!(
                total_tokens = before,
                budget = self.policy.budget,
                "Session still over budget; only protected recent turns remain"
            );
            return Ok(CompressionOutcome::NothingToFold {
                total_tokens: before,
            });
        }

        let messages = self.summary_prompt(session, &session.turns()[..fold]);
        let params = CompletionParams::default()
            .with_temperature(0.0)
            .with_max_tokens(self.policy.summary_max_tokens as u32);

        let text = gateway
            .complete(ModelTier::Simple, messages, params)
            .await
            .map_err(|e| Error::Compression(e.to_string()))?;
        let summary = self
            .counter
            .truncate_to_tokens(text.trim(), self.policy.summary_max_tokens);
        if summary.is_empty() {
            return Err(Error::Compression("model returned an empty summary".to_string()));
        }

        history
            .apply_summary(fold, summary)
            .await
            .map_err(|e| Error::Compression(e.to_string()))?;

        let after = history.session().total_tokens();
        info!(folded = fold, before, after, "Compressed session history");
        if after > self.policy.budget {
            warn!(
                total_tokens = after,
                budget = self.policy.budget,
                "Session still over budget after compression"
            );
        }
        Ok(CompressionOutcome::Compressed {
            folded: fold,
            before,
            after,
        })
    }

    fn summary_prompt(&self, session: &Session, aged: &[Turn]) -> Vec<Message> {
        let previous = session
            .summary()
            .map_or("(none)", |s| s.content.as_str());
        let transcript = aged
            .iter()
            .map(|t| self.counter.truncate_to_tokens(&t.transcript_line(), TURN_TOKEN_CAP))
            .collect::<Vec<_>>()
            .join("\n");

        vec![
            Message::system(SUMMARY_INSTRUCTIONS),
            Message::user(format!(
                "Previous summary:\n{previous}\n\nNew turns:\n{transcript}\n\n\
                 Updated summary (at most {} tokens):",
                self.policy.summary_max_tokens
            )),
        ]
    }
}
