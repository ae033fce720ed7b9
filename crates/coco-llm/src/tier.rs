//! Model tiers
//!
//! Coco works with two cost/capability classes: a fast, cheap model for
//! classification, summarization and simple questions, and a stronger model
//! for multi-step code and planning work.

use serde::{Deserialize, Serialize};

/// Default complex-tier model
pub const DEFAULT_COMPLEX_MODEL: &str = "claude-sonnet-4-6";

/// Default simple-tier model
pub const DEFAULT_SIMPLE_MODEL: &str = "claude-haiku-4-5-20251001";

/// Model tier for cost/capability selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    /// Fast, cheap model
    Simple,
    /// Capable model for multi-step or multi-file work
    Complex,
}

impl ModelTier {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Complex => "complex",
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model identifiers assigned to each tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSelection {
    /// Model used for [`ModelTier::Simple`]
    pub simple: String,
    /// Model used for [`ModelTier::Complex`]
    pub complex: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            simple: DEFAULT_SIMPLE_MODEL.to_string(),
            complex: DEFAULT_COMPLEX_MODEL.to_string(),
        }
    }
}

impl ModelSelection {
    /// Create a selection from explicit model names
    #[must_use]
    pub fn new(simple: impl Into<String>, complex: impl Into<String>) -> Self {
        Self {
            simple: simple.into(),
            complex: complex.into(),
        }
    }

    /// Model identifier for a tier
    #[must_use]
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Simple => &self.simple,
            ModelTier::Complex => &self.complex,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_for_tier() {
        let selection = ModelSelection::default();
        assert_eq!(selection.model_for(ModelTier::Simple), DEFAULT_SIMPLE_MODEL);
        assert_eq!(selection.model_for(ModelTier::Complex), DEFAULT_COMPLEX_MODEL);

        let custom = ModelSelection::new("small", "large");
        assert_eq!(custom.model_for(ModelTier::Complex), "large");
    }

    #[test]
    fn test_tier_serde() {
        assert_eq!(serde_json::to_string(&ModelTier::Complex).unwrap(), "\"complex\"");
        let tier: ModelTier = serde_json::from_str("\"simple\"").unwrap();
        assert_eq!(tier, ModelTier::Simple);
    }
}
