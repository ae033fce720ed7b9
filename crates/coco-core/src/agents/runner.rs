//! The agent loop

use super::kind::AgentKind;
use super::plan::parse_plan;
use super::prompts::{context_message, system_prompt, CodeContext, RECALL_TOOL};
use super::protocol::{extract_clarification, parse_reply, render_observations, RequestedCall};
use super::recall::{recall, DEFAULT_RECALL_LIMIT};
use super::{AgentFailure, AgentResult, ToolCallRecord};
use crate::config::CocoConfig;
use crate::error::{Error, Result, UserFacing};
use crate::executor::{describe_call, ConfirmationChannel, ToolExecutor, ToolStatus};
use crate::gateway::LlmGateway;
use crate::history::Session;
use crate::workflow::StateHandle;
use coco_index::CodeIndex;
use coco_llm::{CompletionParams, Message, ModelTier};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Loop limits and prompt sizing
#[derive(Debug, Clone, PartialEq)]
pub struct AgentOptions {
    /// Completion requests per run
    pub max_steps: usize,
    /// Verbatim turns included in the prompt
    pub context_turns: usize,
    /// Index chunks pre-fetched for the prompt
    pub query_results: usize,
    /// Sampling parameters for agent completions
    pub params: CompletionParams,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self::from_config(&CocoConfig::default())
    }
}

impl AgentOptions {
    /// Options from the loaded configuration
    #[must_use]
    pub fn from_config(config: &CocoConfig) -> Self {
        Self {
            max_steps: config.agent.max_steps.max(1),
            context_turns: config.memory.context_turns,
            query_results: config.index.query_results,
            params: config.model.completion_params(),
        }
    }

    /// Set the step limit
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }
}

/// What to run
#[derive(Debug, Clone, Copy)]
pub struct AgentTask<'a> {
    /// Agent to run
    pub agent: AgentKind,
    /// Model tier for every completion of the run
    pub tier: ModelTier,
    /// The user's request
    pub utterance: &'a str,
    /// Session as of the start of the turn
    pub session: &'a Session,
}

/// Runs agents against the gateway, the executor and the index
pub struct AgentRunner {
    gateway: Arc<LlmGateway>,
    executor: ToolExecutor,
    index: Option<Arc<dyn CodeIndex>>,
    options: AgentOptions,
}

enum Ending {
    Final,
    StepLimit,
}

impl AgentRunner {
    /// Create a runner
    #[must_use]
    pub fn new(
        gateway: Arc<LlmGateway>,
        executor: ToolExecutor,
        index: Option<Arc<dyn CodeIndex>>,
        options: AgentOptions,
    ) -> Self {
        Self {
            gateway,
            executor,
            index,
            options,
        }
    }

    /// Loop options
    #[must_use]
    pub fn options(&self) -> &AgentOptions {
        &self.options
    }

    /// Run one agent to completion
    ///
    /// Provider failures end the run with [`AgentResult::failure`] set and
    /// keep the calls already made.
    ///
    /// # Errors
    /// Only a confirmation channel failure, which aborts the turn.
    #[instrument(skip(self, task, channel, state), fields(agent = %task.agent, tier = %task.tier))]
    pub async fn run(
        &self,
        task: AgentTask<'_>,
        channel: &dyn ConfirmationChannel,
        state: &StateHandle,
    ) -> Result<AgentResult> {
        let kind = task.agent;
        let code = self.code_context(kind, task.utterance).await;
        let degraded = matches!(code, CodeContext::Unavailable(_));

        let mut messages = vec![
            Message::system(system_prompt(kind, self.executor.registry())),
            Message::user(context_message(
                task.session,
                self.options.context_turns,
                &code,
                task.utterance,
            )),
        ];
        let mut records = Vec::new();
        let mut last_text = String::new();

        for step in 1..=self.options.max_steps {
            let reply = match self
                .gateway
                .complete(task.tier, messages.clone(), self.options.params.clone())
                .await
            {
                Ok(reply) => reply,
                Err(e) => {
                    warn!(step, error = %e, "Agent completion failed");
                    return Ok(failed(kind, &e, records, step - 1, degraded));
                }
            };

            let parsed = parse_reply(&reply);
            if parsed.is_final() {
                info!(step, tool_calls = records.len(), "Agent finished");
                return Ok(finish(kind, parsed.text, records, step, degraded, Ending::Final));
            }

            debug!(step, calls = parsed.calls.len(), "Agent requested tools");
            if !parsed.text.is_empty() {
                last_text = parsed.text.clone();
            }
            messages.push(Message::assistant(reply));

            let observations = self
                .run_calls(kind, parsed.calls, task.session, channel, state, &mut records)
                .await?;
            messages.push(Message::user(render_observations(&observations)));
        }

        warn!(max_steps = self.options.max_steps, "Agent reached the step limit");
        let steps = self.options.max_steps;
        Ok(finish(kind, last_text, records, steps, degraded, Ending::StepLimit))
    }

    async fn code_context(&self, kind: AgentKind, utterance: &str) -> CodeContext {
        if !kind.uses_code_context() {
            return CodeContext::NotUsed;
        }
        let Some(index) = &self.index else {
            return CodeContext::Unavailable("no code index is open".to_string());
        };
        match index.query(utterance, self.options.query_results).await {
            Ok(chunks) => CodeContext::Chunks(chunks),
            Err(e) => {
                let e = Error::from(e);
                warn!(error = %e, "Continuing without code context");
                CodeContext::Unavailable(e.user_message())
            }
        }
    }

    async fn run_calls(
        &self,
        kind: AgentKind,
        calls: Vec<std::result::Result<RequestedCall, String>>,
        session: &Session,
        channel: &dyn ConfirmationChannel,
        state: &StateHandle,
        records: &mut Vec<ToolCallRecord>,
    ) -> Result<Vec<(String, String)>> {
        let mut observations = Vec::new();
        let mut edited: Option<String> = None;

        for call in calls {
            let call = match call {
                Ok(call) => call,
                Err(reason) => {
                    warn!(reason = %reason, "Malformed tool call");
                    observations.push(("tool_call".to_string(), format!("Error: {reason}")));
                    continue;
                }
            };

            if let Some(path) = &edited {
                let observation = format!(
                    "Skipped: {path} was changed earlier in this response. Check its new content \
                     above and request this call again if it is still needed."
                );
                records.push(record(&call, ToolStatus::Skipped, &observation));
                observations.push((call.name, observation));
                continue;
            }

            if !kind.allows(&call.name) {
                warn!(tool = %call.name, "Tool outside the agent's set requested");
                observations.push((
                    call.name.clone(),
                    format!(
                        "Error: tool '{}' is not available to the {kind} agent. Available: {}",
                        call.name,
                        kind.tools().join(", ")
                    ),
                ));
                continue;
            }

            if call.name == RECALL_TOOL {
                let observation = recall_call(session, &call.arguments);
                records.push(record(&call, ToolStatus::Executed, &observation));
                observations.push((call.name, observation));
                continue;
            }

            let prepared = self.executor.prepare(&call.name, call.arguments.clone());
            let outcome = self.executor.execute(prepared, kind, channel, state).await?;

            // Calls rejected before running (unknown tool) stay out of the trace
            if outcome.result.is_some() || outcome.status != ToolStatus::Failed {
                records.push(record(&call, outcome.status, &outcome.observation));
            }
            observations.push((call.name.clone(), outcome.observation));

            if call.name == "write_file" && outcome.status == ToolStatus::Executed {
                if let Some(path) = call.arguments.get("path").and_then(Value::as_str) {
                    let reread = self.reread(kind, path, channel, state, records).await?;
                    observations.push(("read_file".to_string(), reread));
                    self.refresh_index(path).await;
                    edited = Some(path.to_string());
                }
            }
        }

        Ok(observations)
    }

    async fn reread(
        &self,
        kind: AgentKind,
        path: &str,
        channel: &dyn ConfirmationChannel,
        state: &StateHandle,
        records: &mut Vec<ToolCallRecord>,
    ) -> Result<String> {
        let call = RequestedCall {
            name: "read_file".to_string(),
            arguments: json!({ "path": path }),
        };
        let prepared = self.executor.prepare(&call.name, call.arguments.clone());
        let outcome = self.executor.execute(prepared, kind, channel, state).await?;
        records.push(record(&call, outcome.status, &outcome.observation));
        Ok(format!(
            "Current content of {path} after the edit:\n{}",
            outcome.observation
        ))
    }

    async fn refresh_index(&self, path: &str) {
        let Some(index) = &self.index else {
            return;
        };
        match index.update(&[PathBuf::from(path)]).await {
            Ok(report) => debug!(path, chunks = report.chunks_created, "Index refreshed"),
            Err(e) => warn!(path, error = %e, "Failed to refresh index after edit"),
        }
    }
}

fn record(call: &RequestedCall, status: ToolStatus, observation: &str) -> ToolCallRecord {
    ToolCallRecord {
        name: call.name.clone(),
        arguments: call.arguments.clone(),
        status,
        observation: observation.to_string(),
    }
}

fn recall_call(session: &Session, arguments: &Value) -> String {
    let query = arguments.get("query").and_then(Value::as_str).unwrap_or("");
    let limit = arguments
        .get("limit")
        .and_then(Value::as_u64)
        .map_or(DEFAULT_RECALL_LIMIT, |n| n as usize);
    recall(session, query, limit)
}

fn finish(
    kind: AgentKind,
    text: String,
    records: Vec<ToolCallRecord>,
    steps: usize,
    degraded: bool,
    ending: Ending,
) -> AgentResult {
    let (mut text, clarification) = extract_clarification(&text);
    if text.is_empty() {
        text = match (&clarification, &ending) {
            (Some(question), _) => question.clone(),
            (None, Ending::StepLimit) => format!("Stopped after {steps} steps without an answer."),
            (None, Ending::Final) => "(no answer)".to_string(),
        };
    }

    let plan = (kind == AgentKind::Plan)
        .then(|| parse_plan(&text))
        .flatten();

    let denied: Vec<String> = records
        .iter()
        .filter(|r| r.status == ToolStatus::Denied)
        .map(|r| describe_call(&r.name, &r.arguments))
        .collect();
    if !denied.is_empty() {
        text.push_str(&format!("\n\nDeclined, not applied: {}", denied.join("; ")));
    }

    let partial = matches!(ending, Ending::StepLimit);
    if partial {
        text.push_str(&format!(
            "\n\n(Stopped at the limit of {steps} steps; this answer is partial.)"
        ));
    }
    if degraded {
        text.push_str("\n\n(Answered without code index context.)");
    }

    AgentResult {
        agent: kind,
        text,
        tool_calls_made: records,
        steps,
        terminal: true,
        partial,
        degraded,
        clarification,
        plan,
        failure: None,
    }
}

fn failed(
    kind: AgentKind,
    error: &Error,
    records: Vec<ToolCallRecord>,
    steps: usize,
    degraded: bool,
) -> AgentResult {
    let message = error.user_message();
    AgentResult {
        agent: kind,
        text: format!("The request failed: {message}"),
        tool_calls_made: records,
        steps,
        terminal: true,
        partial: false,
        degraded,
        clarification: None,
        plan: None,
        failure: Some(AgentFailure {
            message,
            hint: error.hint(),
        }),
    }
}
