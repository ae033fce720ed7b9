//! Router
//!
//! Turns an utterance into a [`RouteDecision`]. An explicit agent command
//! wins outright. Otherwise one short classification call on the simple
//! tier picks the agent; unparseable, low-confidence or failed
//! classifications fall back to Ask. The tier comes from [`TierPolicy`].

mod tier;

#[cfg(test)]
mod tests;

pub use tier::{file_references, TierPolicy};

use crate::agents::AgentKind;
use crate::config::RouterSettings;
use crate::gateway::LlmGateway;
use coco_llm::{CompletionParams, Message, ModelTier};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

const CLASSIFIER_PROMPT: &str = "Classify the developer request into exactly one category.\n\
code: change, create, fix, refactor or run something in the local repository\n\
plan: design or break down work into steps before changing anything\n\
ask: explain or answer a question about the local code or this conversation\n\
search: needs information from the web (docs, releases, error messages, libraries)\n\
Reply with the category name followed by your confidence between 0 and 1, \
for example: ask 0.8";

/// Confidence assumed when the classifier names a label without a number
const UNSTATED_CONFIDENCE: f32 = 0.5;

/// Routing result for one user turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteDecision {
    /// Selected agent
    pub agent: AgentKind,
    /// Model tier for the agent's completions
    pub tier: ModelTier,
    /// Classifier confidence (1.0 for explicit commands)
    pub confidence: f32,
    /// Selected by an explicit command
    pub explicit: bool,
}

/// User input for one turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInput {
    /// Request text, without any agent command
    pub utterance: String,
    /// Agent named by an explicit command
    pub explicit: Option<AgentKind>,
}

impl TurnInput {
    /// Auto-routed input
    #[must_use]
    pub fn auto(utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            explicit: None,
        }
    }

    /// Input for a specific agent
    #[must_use]
    pub fn explicit(agent: AgentKind, utterance: impl Into<String>) -> Self {
        Self {
            utterance: utterance.into(),
            explicit: Some(agent),
        }
    }

    /// Parse a line, recognising `/code`, `/plan`, `/ask` and `/search`
    ///
    /// Any other text, including other slash commands, is auto-routed.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix('/') {
            let (command, utterance) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            if let Ok(agent) = command.parse::<AgentKind>() {
                return Self::explicit(agent, utterance.trim());
            }
        }
        Self::auto(line)
    }
}

/// Agent and tier selection
#[derive(Debug, Clone)]
pub struct Router {
    min_confidence: f32,
    tiers: TierPolicy,
}

impl Default for Router {
    fn default() -> Self {
        Self::from_settings(&RouterSettings::default())
    }
}

impl Router {
    /// Router from `[router]` settings
    #[must_use]
    pub fn from_settings(settings: &RouterSettings) -> Self {
        Self {
            min_confidence: settings.min_confidence,
            tiers: TierPolicy::from_settings(settings),
        }
    }

    /// Tier policy in use
    #[must_use]
    pub fn tiers(&self) -> &TierPolicy {
        &self.tiers
    }

    /// Route one turn; never fails
    #[instrument(skip(self, input, gateway), fields(explicit = input.explicit.is_some()))]
    pub async fn route(&self, input: &TurnInput, gateway: &LlmGateway) -> RouteDecision {
        let (agent, confidence, explicit) = match input.explicit {
            Some(agent) => (agent, 1.0, true),
            None => {
                let (agent, confidence) = self.classify(&input.utterance, gateway).await;
                (agent, confidence, false)
            }
        };

        let decision = RouteDecision {
            agent,
            tier: self.tiers.tier_for(agent, &input.utterance),
            confidence,
            explicit,
        };
        info!(
            agent = %decision.agent,
            tier = %decision.tier,
            confidence = decision.confidence,
            explicit = decision.explicit,
            "Route decided"
        );
        decision
    }

    async fn classify(&self, utterance: &str, gateway: &LlmGateway) -> (AgentKind, f32) {
        let messages = vec![
            Message::system(CLASSIFIER_PROMPT),
            Message::user(utterance.to_string()),
        ];
        let params = CompletionParams::default()
            .with_temperature(0.0)
            .with_max_tokens(16);

        let reply = match gateway.complete(ModelTier::Simple, messages, params).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Classification failed, falling back to ask");
                return (AgentKind::Ask, 0.0);
            }
        };

        match parse_classification(&reply) {
            Some((agent, confidence)) if confidence >= self.min_confidence => (agent, confidence),
            Some((agent, confidence)) => {
                warn!(
                    label = %agent,
                    confidence,
                    min_confidence = self.min_confidence,
                    "Low-confidence classification, falling back to ask"
                );
                (AgentKind::Ask, confidence)
            }
            None => {
                warn!(reply = %reply.trim(), "Ambiguous classification, falling back to ask");
                (AgentKind::Ask, 0.0)
            }
        }
    }
}

/// Extract `(agent, confidence)` from a classifier reply
///
/// The first word naming an agent is the label; the first number in 0..=1
/// after it is the confidence.
#[must_use]
pub fn parse_classification(reply: &str) -> Option<(AgentKind, f32)> {
    let words: Vec<&str> = reply
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '(' | ')' | '='))
        .filter(|w| !w.is_empty())
        .collect();

    let position = words.iter().position(|w| {
        w.trim_matches(|c: char| !c.is_alphabetic())
            .parse::<AgentKind>()
            .is_ok()
    })?;
    let agent = words[position]
        .trim_matches(|c: char| !c.is_alphabetic())
        .parse()
        .ok()?;

    let confidence = words[position + 1..]
        .iter()
        .filter_map(|w| w.trim_end_matches(['.', '%']).parse::<f32>().ok())
        .find(|c| (0.0..=1.0).contains(c))
        .unwrap_or(UNSTATED_CONFIDENCE);

    Some((agent, confidence))
}
