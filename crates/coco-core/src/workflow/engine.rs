//! The workflow engine

use super::state::{StateHandle, WorkflowState};
use crate::agents::{AgentOptions, AgentResult, AgentRunner, AgentTask};
use crate::cache::CacheStats;
use crate::compression::{CompressionOutcome, CompressionPolicy, ContextCompressor};
use crate::config::CocoConfig;
use crate::error::{Error, Result, UserFacing};
use crate::executor::{describe_call, ConfirmationChannel, ToolExecutor};
use crate::gateway::LlmGateway;
use crate::history::{HistoryStore, PendingTurn, Turn};
use crate::router::{RouteDecision, Router, TurnInput};
use coco_index::{CodeIndex, IndexReport, IndexStats};
use coco_tools::{ToolRegistry, ToolRunner};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

/// Observation tokens kept on a tool turn in history
const TOOL_TURN_TOKENS: usize = 200;

/// A completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnReport {
    /// Routing decision
    pub route: RouteDecision,
    /// What the agent produced
    pub result: AgentResult,
    /// Compression pass run after the turn, if any
    pub compression: Option<CompressionOutcome>,
}

/// How a turn ended
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The agent answered; the turn is in history
    Completed(TurnReport),
    /// Cancelled before completion; history is unchanged
    Aborted,
    /// The turn could not complete
    Failed {
        /// One-line reason
        reason: String,
        /// Suggested fix
        hint: Option<String>,
    },
}

/// Snapshot for `/status`
#[derive(Debug, Clone)]
pub struct EngineStatus {
    /// Provider name
    pub provider: String,
    /// Simple-tier model
    pub simple_model: String,
    /// Complex-tier model
    pub complex_model: String,
    /// Cache backend name
    pub cache_backend: &'static str,
    /// Stored cache entries
    pub cache_entries: usize,
    /// Hits and misses this process
    pub cache_stats: CacheStats,
    /// Index statistics, or why there are none
    pub index: std::result::Result<IndexStats, String>,
    /// Session token total
    pub session_tokens: usize,
    /// Verbatim turns in the session
    pub session_turns: usize,
    /// Turns folded into the summary so far
    pub summarized_turns: usize,
}

/// Drives turns through routing, the agent, history and compression
pub struct WorkflowEngine {
    gateway: Arc<LlmGateway>,
    router: Router,
    agents: AgentRunner,
    compressor: ContextCompressor,
    history: HistoryStore,
    index: Option<Arc<dyn CodeIndex>>,
    state: StateHandle,
}

impl WorkflowEngine {
    /// Assemble an engine
    #[must_use]
    pub fn new(
        config: &CocoConfig,
        gateway: Arc<LlmGateway>,
        registry: Arc<ToolRegistry>,
        index: Option<Arc<dyn CodeIndex>>,
        history: HistoryStore,
    ) -> Self {
        let executor = ToolExecutor::new(ToolRunner::with_defaults(registry));
        let agents = AgentRunner::new(
            Arc::clone(&gateway),
            executor,
            index.clone(),
            AgentOptions::from_config(config),
        );
        let compressor = ContextCompressor::new(CompressionPolicy {
            budget: config.memory.max_token_limit,
            keep_recent: config.memory.keep_recent_turns,
            summary_max_tokens: config.memory.summary_max_tokens,
        });

        Self {
            gateway,
            router: Router::from_settings(&config.router),
            agents,
            compressor,
            history,
            index,
            state: StateHandle::new(),
        }
    }

    /// Handle to the current workflow state
    #[must_use]
    pub fn state(&self) -> &StateHandle {
        &self.state
    }

    /// The active history
    #[must_use]
    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// The gateway shared by router, agents and compressor
    #[must_use]
    pub fn gateway(&self) -> &Arc<LlmGateway> {
        &self.gateway
    }

    /// The code index, when one is open
    #[must_use]
    pub fn index(&self) -> Option<&Arc<dyn CodeIndex>> {
        self.index.as_ref()
    }

    /// Run one turn
    ///
    /// `cancel` aborts the turn at any await point before the commit. The
    /// confirmation channel is consulted for every gated tool call.
    #[instrument(skip_all, fields(session_id = %self.history.session().id()))]
    pub async fn handle_turn(
        &mut self,
        input: TurnInput,
        cancel: CancellationToken,
        confirm: &dyn ConfirmationChannel,
    ) -> TurnOutcome {
        let utterance = input.utterance.trim().to_string();
        if utterance.is_empty() {
            return TurnOutcome::Failed {
                reason: "Nothing to do: the request is empty.".to_string(),
                hint: Some("Type a request, or /help for commands.".to_string()),
            };
        }

        self.state.set(WorkflowState::Routing);
        let work = async {
            let route = self.router.route(&input, &self.gateway).await;
            self.state.set(WorkflowState::AgentRunning);
            let task = AgentTask {
                agent: route.agent,
                tier: route.tier,
                utterance: &utterance,
                session: self.history.session(),
            };
            let result = self.agents.run(task, confirm, &self.state).await?;
            Ok::<_, Error>((route, result))
        };

        let finished = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            finished = work => Some(finished),
        };

        let (route, result) = match finished {
            None => return self.abort("cancelled"),
            Some(Err(Error::Aborted(reason))) => return self.abort(&reason),
            Some(Err(e)) => {
                error!(error = %e, "Turn failed");
                self.state.set(WorkflowState::Idle);
                return TurnOutcome::Failed {
                    reason: e.user_message(),
                    hint: e.hint(),
                };
            }
            Some(Ok(done)) => done,
        };

        let pending = self.pending_turn(&utterance, &route, &result);
        if let Err(e) = self.history.commit(pending).await {
            error!(error = %e, "Failed to record turn");
            self.state.set(WorkflowState::Idle);
            return TurnOutcome::Failed {
                reason: e.user_message(),
                hint: e.hint(),
            };
        }

        let compression = self.compress().await;
        self.state.set(WorkflowState::Idle);

        info!(
            agent = %route.agent,
            tier = %route.tier,
            steps = result.steps,
            tool_calls = result.tool_calls_made.len(),
            total_tokens = self.history.session().total_tokens(),
            "Turn completed"
        );

        match &result.failure {
            Some(failure) => TurnOutcome::Failed {
                reason: failure.message.clone(),
                hint: failure.hint.clone(),
            },
            None => TurnOutcome::Completed(TurnReport {
                route,
                result,
                compression,
            }),
        }
    }

    fn abort(&self, reason: &str) -> TurnOutcome {
        info!(reason, "Turn aborted; history unchanged");
        self.state.set(WorkflowState::Idle);
        TurnOutcome::Aborted
    }

    fn pending_turn(&self, utterance: &str, route: &RouteDecision, result: &AgentResult) -> PendingTurn {
        let counter = self.history.counter();
        let mut pending = PendingTurn::new();
        pending.push(Turn::user(utterance).with_agent(route.agent));
        for record in &result.tool_calls_made {
            let content = format!(
                "{} -> {}",
                describe_call(&record.name, &record.arguments),
                counter.truncate_to_tokens(record.observation.trim(), TOOL_TURN_TOKENS)
            );
            pending.push(Turn::tool(&record.name, record.status, content).with_agent(route.agent));
        }
        pending.push(Turn::agent(route.agent, &result.text));
        pending
    }

    async fn compress(&mut self) -> Option<CompressionOutcome> {
        if !self.compressor.needs_compression(self.history.session()) {
            return None;
        }
        self.state.set(WorkflowState::Compressing);
        match self
            .compressor
            .maybe_compress(&mut self.history, &self.gateway)
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "Compression failed; history kept as is");
                None
            }
        }
    }

    /// End the session and start a new one
    ///
    /// # Errors
    /// Fails when the new session log cannot be created.
    pub async fn reset(&mut self) -> Result<()> {
        self.history.reset().await?;
        self.state.set(WorkflowState::Idle);
        Ok(())
    }

    /// Record the end of the session
    ///
    /// # Errors
    /// Fails when the log record cannot be written.
    pub async fn close(&self) -> Result<()> {
        self.history.close().await
    }

    /// Rebuild the code index from scratch
    ///
    /// # Errors
    /// [`Error::IndexUnavailable`] without an index, or the index failure.
    pub async fn rebuild_index(&self) -> Result<IndexReport> {
        let index = self
            .index
            .as_ref()
            .ok_or_else(|| Error::IndexUnavailable("no code index is open".to_string()))?;
        Ok(index.rebuild().await?)
    }

    /// Current status
    pub async fn status(&self) -> EngineStatus {
        let models = self.gateway.models();
        let index = match &self.index {
            Some(index) => index
                .stats()
                .await
                .map_err(|e| Error::from(e).user_message()),
            None => Err("no code index is open".to_string()),
        };
        let session = self.history.session();

        EngineStatus {
            provider: self.gateway.provider_name().to_string(),
            simple_model: models.simple.clone(),
            complex_model: models.complex.clone(),
            cache_backend: self.gateway.cache().backend(),
            cache_entries: self.gateway.cache().len().await,
            cache_stats: self.gateway.cache().stats(),
            index,
            session_tokens: session.total_tokens(),
            session_turns: session.turns().len(),
            summarized_turns: session.summary().map_or(0, |s| s.covers_turns),
        }
    }
}

