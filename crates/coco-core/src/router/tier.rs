//! Model tier policy
//!
//! The tier is a pure function of the agent and the utterance: complex for
//! eligible agents when the request reads as multi-step or names several
//! files, simple otherwise.

use crate::agents::AgentKind;
use crate::config::RouterSettings;
use coco_llm::ModelTier;
use std::collections::BTreeSet;

const EDGE_PUNCTUATION: &[char] = &[
    ',', ';', ':', '(', ')', '[', ']', '{', '}', '\'', '"', '`', '?', '!', '.',
];

/// Deterministic agent/utterance to tier mapping
#[derive(Debug, Clone, PartialEq)]
pub struct TierPolicy {
    complex_agents: Vec<AgentKind>,
    markers: Vec<String>,
    multi_file_threshold: usize,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self::from_settings(&RouterSettings::default())
    }
}

impl TierPolicy {
    /// Policy from `[router]` settings
    #[must_use]
    pub fn from_settings(settings: &RouterSettings) -> Self {
        Self {
            complex_agents: settings.complex_agents.clone(),
            markers: settings
                .multi_step_markers
                .iter()
                .map(|m| normalize_phrase(m))
                .filter(|m| !m.is_empty())
                .collect(),
            multi_file_threshold: settings.multi_file_threshold.max(1),
        }
    }

    /// Tier for a request
    #[must_use]
    pub fn tier_for(&self, agent: AgentKind, utterance: &str) -> ModelTier {
        if !self.complex_agents.contains(&agent) {
            return ModelTier::Simple;
        }
        if self.is_multi_step(utterance) || self.is_multi_file(utterance) {
            ModelTier::Complex
        } else {
            ModelTier::Simple
        }
    }

    /// Whether the utterance contains a multi-step marker phrase
    #[must_use]
    pub fn is_multi_step(&self, utterance: &str) -> bool {
        let text = format!(" {} ", normalize_phrase(utterance));
        self.markers
            .iter()
            .any(|marker| text.contains(&format!(" {marker} ")))
    }

    /// Whether the utterance names at least the threshold of distinct files
    #[must_use]
    pub fn is_multi_file(&self, utterance: &str) -> bool {
        file_references(utterance).len() >= self.multi_file_threshold
    }
}

/// Lower-case words separated by single spaces
fn normalize_phrase(text: &str) -> String {
    text.split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Distinct path-like tokens: `dir/file`, or `name.ext` with a short
/// alphabetic-leading extension
#[must_use]
pub fn file_references(utterance: &str) -> BTreeSet<String> {
    utterance
        .split_whitespace()
        .map(|token| token.trim_matches(EDGE_PUNCTUATION))
        .filter(|token| looks_like_path(token))
        .map(str::to_string)
        .collect()
}

fn looks_like_path(token: &str) -> bool {
    if token.contains("://") {
        return false;
    }
    if let Some((dir, file)) = token.rsplit_once('/') {
        return !file.is_empty() && (!dir.is_empty() || file.contains('.'));
    }
    match token.rsplit_once('.') {
        Some((stem, ext)) => {
            stem.len() > 1
                && (1..=6).contains(&ext.len())
                && ext.starts_with(|c: char| c.is_ascii_alphabetic())
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        }
        None => false,
    }
}
