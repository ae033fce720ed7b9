//! Registry - Tool registration, lookup and confirmation policy
//!
//! Tools are registered once at startup. Agents look definitions up by name
//! to build their prompt, and the executor asks the registry whether a call
//! must pass the confirmation gate before it runs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Risk level of a tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    /// Read-only operations
    Low,
    /// Writes with limited scope
    Medium,
    /// Filesystem mutation or command execution
    High,
}

impl RiskLevel {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Whether this level needs confirmation when no policy says otherwise
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        matches!(self, Self::High)
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Tool category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCategory {
    /// File operations
    File,
    /// Network operations
    Http,
    /// Command execution
    Exec,
    /// Git operations
    Git,
    /// Code index and search operations
    Search,
}

impl ToolCategory {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Http => "http",
            Self::Exec => "exec",
            Self::Git => "git",
            Self::Search => "search",
        }
    }
}

/// Tool metadata and schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name
    pub name: String,
    /// Human-readable description shown to the model
    pub description: String,
    /// JSON schema for arguments
    pub parameters: serde_json::Value,
    /// Risk level
    pub risk_level: RiskLevel,
    /// Tool category
    pub category: ToolCategory,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            risk_level: RiskLevel::Low,
            category: ToolCategory::Search,
        }
    }

    /// Set the parameters schema
    #[must_use]
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Set the risk level
    #[must_use]
    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: ToolCategory) -> Self {
        self.category = category;
        self
    }
}

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether execution succeeded
    pub success: bool,
    /// Output data
    pub output: serde_json::Value,
    /// Error message if failed
    pub error: Option<String>,
    /// Execution duration in milliseconds
    pub duration_ms: u64,
}

impl ToolResult {
    /// Create a successful result
    #[must_use]
    pub fn success(output: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            output,
            error: None,
            duration_ms,
        }
    }

    /// Create a failed result
    #[must_use]
    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            output: serde_json::Value::Null,
            error: Some(error.into()),
            duration_ms,
        }
    }

    /// Render the result as text for the model
    ///
    /// String outputs are passed through, structured outputs are
    /// pretty-printed, failures become `Error: ...`.
    #[must_use]
    pub fn observation(&self) -> String {
        if !self.success {
            let reason = self.error.as_deref().unwrap_or("unknown error");
            return match &self.output {
                serde_json::Value::Null => format!("Error: {reason}"),
                output => format!("Error: {reason}\n{}", render_value(output)),
            };
        }
        render_value(&self.output)
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Trait for tool implementations
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool definition
    fn definition(&self) -> &ToolDefinition;

    /// Execute the tool with given input
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult>;

    /// Validate input before execution
    fn validate_input(&self, input: &serde_json::Value) -> Result<()> {
        if !input.is_object() {
            return Err(Error::InvalidInput("Input must be an object".to_string()));
        }
        Ok(())
    }
}

/// Which categories of side effect pass through the confirmation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPolicy {
    /// Confirm high-risk file tools (writes)
    pub confirm_file_writes: bool,
    /// Confirm command execution tools
    pub confirm_shell_commands: bool,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            confirm_file_writes: true,
            confirm_shell_commands: true,
        }
    }
}

impl ConfirmationPolicy {
    /// Whether a call to a tool with this definition must be confirmed
    #[must_use]
    pub fn requires_confirmation(&self, definition: &ToolDefinition) -> bool {
        match definition.category {
            ToolCategory::File if definition.risk_level != RiskLevel::Low => {
                self.confirm_file_writes
            }
            ToolCategory::Exec => self.confirm_shell_commands,
            _ => definition.risk_level.requires_approval(),
        }
    }
}

/// Registry for managing tools
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    policy: ConfirmationPolicy,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    /// Create a new empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            policy: ConfirmationPolicy::default(),
        }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name.clone();
        debug!(tool = %name, "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Get a tool by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Get a tool definition by name
    #[must_use]
    pub fn get_definition(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name).map(|t| t.definition())
    }

    /// Check if a tool exists
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted
    #[must_use]
    pub fn list_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Replace the confirmation policy
    pub fn set_confirmation_policy(&mut self, policy: ConfirmationPolicy) {
        self.policy = policy;
    }

    /// Current confirmation policy
    #[must_use]
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    /// Whether calls to `name` must be confirmed before execution
    ///
    /// Unknown tools never reach execution, so they report `false`.
    #[must_use]
    pub fn requires_confirmation(&self, name: &str) -> bool {
        self.get_definition(name)
            .is_some_and(|def| self.policy.requires_confirmation(def))
    }

    /// Get tool count
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(ToolDefinition);

    #[async_trait::async_trait]
    impl Tool for Dummy {
        fn definition(&self) -> &ToolDefinition {
            &self.0
        }

        async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
            Ok(ToolResult::success(serde_json::json!("ok"), 0))
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Dummy(
            ToolDefinition::new("write_file", "w")
                .with_category(ToolCategory::File)
                .with_risk_level(RiskLevel::High),
        )));
        registry.register(Arc::new(Dummy(
            ToolDefinition::new("read_file", "r").with_category(ToolCategory::File),
        )));
        registry.register(Arc::new(Dummy(
            ToolDefinition::new("run_command", "x")
                .with_category(ToolCategory::Exec)
                .with_risk_level(RiskLevel::High),
        )));
        registry.register(Arc::new(Dummy(ToolDefinition::new("search_codebase", "s"))));
        registry
    }

    #[test]
    fn test_risk_level() {
        assert_eq!(RiskLevel::Low.as_str(), "low");
        assert!(!RiskLevel::Low.requires_approval());
        assert!(!RiskLevel::Medium.requires_approval());
        assert!(RiskLevel::High.requires_approval());
    }

    #[test]
    fn test_default_policy_confirms_writes_and_commands() {
        let registry = registry();
        assert!(registry.requires_confirmation("write_file"));
        assert!(registry.requires_confirmation("run_command"));
        assert!(!registry.requires_confirmation("read_file"));
        assert!(!registry.requires_confirmation("search_codebase"));
        assert!(!registry.requires_confirmation("missing"));
    }

    #[test]
    fn test_policy_flags_are_independent() {
        let mut registry = registry();
        registry.set_confirmation_policy(ConfirmationPolicy {
            confirm_file_writes: false,
            confirm_shell_commands: true,
        });
        assert!(!registry.requires_confirmation("write_file"));
        assert!(registry.requires_confirmation("run_command"));
    }

    #[test]
    fn test_list_names_sorted() {
        assert_eq!(
            registry().list_names(),
            vec!["read_file", "run_command", "search_codebase", "write_file"]
        );
    }

    #[test]
    fn test_observation_rendering() {
        let ok = ToolResult::success(serde_json::json!("plain text"), 3);
        assert_eq!(ok.observation(), "plain text");

        let structured = ToolResult::success(serde_json::json!({"count": 2}), 3);
        assert!(structured.observation().contains("\"count\": 2"));

        let failed = ToolResult::failure("boom", 1);
        assert_eq!(failed.observation(), "Error: boom");
    }
}
