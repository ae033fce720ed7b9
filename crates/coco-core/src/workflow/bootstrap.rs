//! Engine assembly from configuration

use super::engine::WorkflowEngine;
use crate::cache::ResponseCache;
use crate::config::CocoConfig;
use crate::error::Result;
use crate::gateway::LlmGateway;
use crate::history::HistoryStore;
use coco_index::{CodeIndex, LexicalIndex};
use coco_llm::LlmProvider;
use coco_tools::{register_builtins, BuiltinsConfig, ToolRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Open the response cache described by `[cache]`
///
/// A persistent cache that cannot be opened falls back to an in-memory one.
pub async fn open_cache(config: &CocoConfig) -> ResponseCache {
    let settings = &config.cache;
    if !settings.enabled {
        info!("Response cache disabled");
        return ResponseCache::disabled();
    }

    let path = settings.resolved_path();
    match ResponseCache::open_sqlite(&path, settings.max_entries).await {
        Ok(cache) => cache,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Falling back to in-memory response cache");
            ResponseCache::in_memory(settings.max_entries)
        }
    }
}

/// Open the code index for `root`
///
/// Returns `None` when the index cannot be opened; agents then run
/// without code context.
pub async fn open_index(config: &CocoConfig, root: &Path) -> Option<Arc<dyn CodeIndex>> {
    match LexicalIndex::open(config.index.index_config(root)).await {
        Ok(index) => Some(Arc::new(index)),
        Err(e) => {
            warn!(root = %root.display(), error = %e, "Code index unavailable");
            None
        }
    }
}

/// Registry with every built-in tool and the `[safety]` policy applied
#[must_use]
pub fn build_registry(
    config: &CocoConfig,
    root: &Path,
    index: Option<&Arc<dyn CodeIndex>>,
) -> ToolRegistry {
    let mut builtins = BuiltinsConfig::new(root).with_exec(config.safety.exec_config());
    if let Some(index) = index {
        builtins = builtins.with_index(Arc::clone(index), config.index.query_results);
    }

    let mut registry = ToolRegistry::new();
    register_builtins(&mut registry, &builtins);
    registry.set_confirmation_policy(config.safety.confirmation_policy());
    info!(tools = registry.len(), "Tool registry initialized");
    registry
}

/// Build a ready engine working in `root`
///
/// # Errors
/// Fails when the history directory or session log cannot be created.
pub async fn build_engine(
    config: &CocoConfig,
    root: &Path,
    provider: Arc<dyn LlmProvider>,
) -> Result<WorkflowEngine> {
    let cache = open_cache(config).await;
    info!(backend = cache.backend(), "Response cache ready");

    let gateway = LlmGateway::new(provider, Arc::new(cache), config.model.selection())
        .with_retry(config.retry.retry_config());

    let index = open_index(config, root).await;
    let registry = build_registry(config, root, index.as_ref());
    let history = HistoryStore::open(config.memory.resolved_history_dir()).await?;

    Ok(WorkflowEngine::new(
        config,
        Arc::new(gateway),
        Arc::new(registry),
        index,
        history,
    ))
}
