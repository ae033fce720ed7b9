//! Typed configuration
//!
//! Every section derives `Default` and every field is `#[serde(default)]`, so
//! a partial TOML file merges over the built-in values. Loading the layers
//! (defaults, global file, project `.coco`, environment) is done by the
//! binary; this module only defines the shape and the conversions into the
//! sub-crate configurations.

use crate::agents::AgentKind;
use crate::utils::RetryConfig;
use coco_index::IndexConfig;
use coco_llm::{CompletionParams, ModelSelection};
use coco_tools::{ConfirmationPolicy, ExecConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root directory for coco's own data (`~/.coco`)
#[must_use]
pub fn coco_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".coco")
}

fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest),
        Err(_) => path.to_path_buf(),
    }
}

/// Complete coco configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CocoConfig {
    /// Model names and sampling
    pub model: ModelSettings,
    /// Code index
    pub index: IndexSettings,
    /// History budget and compression
    pub memory: MemorySettings,
    /// Response cache
    pub cache: CacheSettings,
    /// Confirmation gate and command execution
    pub safety: SafetySettings,
    /// Agent loop limits
    pub agent: AgentSettings,
    /// Routing policy
    pub router: RouterSettings,
    /// Provider retry policy
    pub retry: RetrySettings,
}

/// `[model]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Model for multi-step code and planning work
    pub complex_model: String,
    /// Model for routing, summaries and simple questions
    pub simple_model: String,
    /// Sampling temperature for agent completions
    pub temperature: f32,
    /// Completion length cap for agent completions
    pub max_tokens: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        let models = ModelSelection::default();
        Self {
            complex_model: models.complex,
            simple_model: models.simple,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

impl ModelSettings {
    /// Tier-to-model mapping
    #[must_use]
    pub fn selection(&self) -> ModelSelection {
        ModelSelection::new(&self.simple_model, &self.complex_model)
    }

    /// Sampling parameters for agent completions
    #[must_use]
    pub fn completion_params(&self) -> CompletionParams {
        CompletionParams::default()
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
    }
}

/// `[index]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Characters per chunk
    pub chunk_size: usize,
    /// Characters shared by neighbouring chunks
    pub chunk_overlap: usize,
    /// Index location, relative to the working directory unless absolute
    pub persist_dir: PathBuf,
    /// File suffixes to index
    pub include_extensions: Vec<String>,
    /// Directory names to skip
    pub exclude_dirs: Vec<String>,
    /// Chunks pre-fetched into an agent prompt
    pub query_results: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        let base = IndexConfig::new(".");
        Self {
            chunk_size: base.chunk_size,
            chunk_overlap: base.chunk_overlap,
            persist_dir: base.persist_dir,
            include_extensions: base.include_extensions,
            exclude_dirs: base.exclude_dirs,
            query_results: 5,
        }
    }
}

impl IndexSettings {
    /// Index configuration rooted at `root`
    #[must_use]
    pub fn index_config(&self, root: &Path) -> IndexConfig {
        IndexConfig::new(root)
            .with_persist_dir(&self.persist_dir)
            .with_chunking(self.chunk_size, self.chunk_overlap)
            .with_include_extensions(self.include_extensions.clone())
            .with_exclude_dirs(self.exclude_dirs.clone())
    }
}

/// `[memory]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Session token budget that triggers compression
    pub max_token_limit: usize,
    /// Turns always kept verbatim
    pub keep_recent_turns: usize,
    /// Upper bound on the rolling summary
    pub summary_max_tokens: usize,
    /// Verbatim turns included in agent prompts
    pub context_turns: usize,
    /// History log directory (`~/.coco/history` when unset)
    pub history_dir: Option<PathBuf>,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_token_limit: 4000,
            keep_recent_turns: 4,
            summary_max_tokens: 512,
            context_turns: 0,
            history_dir: None,
        }
    }
}

impl MemorySettings {
    /// Effective history directory
    #[must_use]
    pub fn resolved_history_dir(&self) -> PathBuf {
        self.history_dir
            .as_deref()
            .map_or_else(|| coco_home().join("history"), expand_home)
    }
}

/// `[cache]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Serve repeated requests from the cache
    pub enabled: bool,
    /// Entries kept before least-recently-used eviction
    pub max_entries: usize,
    /// SQLite file (`~/.coco/cache/llm_cache.db` when unset)
    pub path: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: 1000,
            path: None,
        }
    }
}

impl CacheSettings {
    /// Effective cache database path
    #[must_use]
    pub fn resolved_path(&self) -> PathBuf {
        self.path.as_deref().map_or_else(
            || coco_home().join("cache").join("llm_cache.db"),
            expand_home,
        )
    }
}

/// `[safety]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetySettings {
    /// Ask before any file write
    pub confirm_file_writes: bool,
    /// Ask before any command execution
    pub confirm_shell_commands: bool,
    /// Executables `run_command` may start
    pub allowed_shell_commands: Vec<String>,
    /// Wall-clock limit per command
    pub command_timeout_secs: u64,
}

impl Default for SafetySettings {
    fn default() -> Self {
        let exec = ExecConfig::default();
        Self {
            confirm_file_writes: true,
            confirm_shell_commands: true,
            allowed_shell_commands: exec.allowed_commands,
            command_timeout_secs: exec.timeout_secs,
        }
    }
}

impl SafetySettings {
    /// Confirmation policy for the tool registry
    #[must_use]
    pub fn confirmation_policy(&self) -> ConfirmationPolicy {
        ConfirmationPolicy {
            confirm_file_writes: self.confirm_file_writes,
            confirm_shell_commands: self.confirm_shell_commands,
        }
    }

    /// Configuration for `run_command`
    #[must_use]
    pub fn exec_config(&self) -> ExecConfig {
        ExecConfig {
            allowed_commands: self.allowed_shell_commands.clone(),
            timeout_secs: self.command_timeout_secs,
            ..ExecConfig::default()
        }
    }
}

/// `[agent]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Completion requests an agent may issue in one turn
    pub max_steps: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self { max_steps: 8 }
    }
}

/// `[router]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterSettings {
    /// Classifications below this confidence fall back to Ask
    pub min_confidence: f32,
    /// Agents eligible for the complex tier
    pub complex_agents: Vec<AgentKind>,
    /// Phrases that mark a request as multi-step
    pub multi_step_markers: Vec<String>,
    /// Distinct file references that make a request multi-file
    pub multi_file_threshold: usize,
}

/// Multi-step phrases recognised by default
pub const DEFAULT_MULTI_STEP_MARKERS: &[&str] = &[
    "and then",
    "then",
    "after that",
    "step by step",
    "refactor",
    "migrate",
    "across",
    "every",
    "all files",
    "implement",
    "restructure",
    "rewrite",
];

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            min_confidence: 0.4,
            complex_agents: vec![AgentKind::Code, AgentKind::Plan],
            multi_step_markers: DEFAULT_MULTI_STEP_MARKERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            multi_file_threshold: 2,
        }
    }
}

/// `[retry]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per provider call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay_ms: u64,
    /// Cap on any single delay
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 8000,
        }
    }
}

impl RetrySettings {
    /// Backoff configuration for the gateway
    #[must_use]
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_attempts(self.max_attempts.max(1))
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CocoConfig::default();
        assert_eq!(config.model.complex_model, "claude-sonnet-4-6");
        assert_eq!(config.model.simple_model, "claude-haiku-4-5-20251001");
        assert_eq!(config.index.chunk_size, 1000);
        assert_eq!(config.index.chunk_overlap, 200);
        assert_eq!(config.memory.max_token_limit, 4000);
        assert_eq!(config.memory.keep_recent_turns, 4);
        assert_eq!(config.memory.context_turns, 0);
        assert_eq!(config.cache.max_entries, 1000);
        assert!(config.safety.confirm_file_writes);
        assert!(config.safety.allowed_shell_commands.contains(&"git".to_string()));
        assert_eq!(config.agent.max_steps, 8);
        assert_eq!(config.router.complex_agents, vec![AgentKind::Code, AgentKind::Plan]);
        assert_eq!(config.retry.initial_delay_ms, 500);
    }

    #[test]
    fn test_partial_config_merges_over_defaults() {
        let config: CocoConfig = serde_json::from_value(serde_json::json!({
            "model": {"simple_model": "tiny"},
            "safety": {"confirm_file_writes": false},
            "router": {"complex_agents": ["code"]}
        }))
        .unwrap();
        assert_eq!(config.model.simple_model, "tiny");
        assert_eq!(config.model.complex_model, "claude-sonnet-4-6");
        assert!(!config.safety.confirm_file_writes);
        assert!(config.safety.confirm_shell_commands);
        assert_eq!(config.router.complex_agents, vec![AgentKind::Code]);
        assert_eq!(config.memory, MemorySettings::default());
    }

    #[test]
    fn test_conversions() {
        let config = CocoConfig::default();
        assert_eq!(config.model.selection(), ModelSelection::default());
        assert_eq!(config.model.completion_params().max_tokens, 4096);

        let index = config.index.index_config(Path::new("/repo"));
        assert_eq!(index.root, PathBuf::from("/repo"));
        assert_eq!(index.persist_dir, PathBuf::from(".coco_index"));

        let exec = config.safety.exec_config();
        assert_eq!(exec.timeout_secs, 30);
        assert!(exec.is_allowed("ls"));

        let retry = config.retry.retry_config();
        assert_eq!(retry.max_attempts, 3);
        assert_eq!(retry.max_delay, Duration::from_millis(8000));
    }

    #[test]
    fn test_paths_resolve_under_home() {
        let config = CocoConfig::default();
        assert!(config.cache.resolved_path().ends_with(".coco/cache/llm_cache.db"));
        assert!(config.memory.resolved_history_dir().ends_with(".coco/history"));

        let explicit = CacheSettings {
            path: Some(PathBuf::from("/tmp/cache.db")),
            ..CacheSettings::default()
        };
        assert_eq!(explicit.resolved_path(), PathBuf::from("/tmp/cache.db"));
    }
}
