//! Code index tools

use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use coco_index::{CodeIndex, ScoredChunk};
use std::sync::Arc;
use std::time::Instant;

/// Results returned when the caller does not ask for a count
pub const DEFAULT_RESULTS: usize = 5;

const MAX_RESULTS: usize = 20;

/// Render ranked chunks the way agents and tools show code context
#[must_use]
pub fn format_chunks(chunks: &[ScoredChunk]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "[{}] {} (bytes {}-{}, score {:.2})\n```\n{}\n```",
                i + 1,
                hit.chunk.path,
                hit.chunk.byte_range.start,
                hit.chunk.byte_range.end,
                hit.score,
                hit.chunk.text.trim_end()
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Search the code index
pub struct SearchCodebaseTool {
    definition: ToolDefinition,
    index: Arc<dyn CodeIndex>,
    default_results: usize,
}

impl SearchCodebaseTool {
    /// Create the tool over an index
    #[must_use]
    pub fn new(index: Arc<dyn CodeIndex>, default_results: usize) -> Self {
        let definition = ToolDefinition::new(
            "search_codebase",
            "Find the code chunks most relevant to a natural-language or identifier query.",
        )
        .with_category(ToolCategory::Search)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for"
                },
                "n_results": {
                    "type": "integer",
                    "description": "Number of chunks to return (default 5, max 20)"
                }
            },
            "required": ["query"]
        }));

        Self {
            definition,
            index,
            default_results: default_results.max(1),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchCodebaseTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let query = input
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'query' parameter".to_string()))?;
        let k = input
            .get("n_results")
            .and_then(|v| v.as_u64())
            .map_or(self.default_results, |n| (n as usize).clamp(1, MAX_RESULTS));

        let hits = self
            .index
            .query(query, k)
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;

        let text = if hits.is_empty() {
            format!("No indexed code matches '{query}'.")
        } else {
            format_chunks(&hits)
        };
        Ok(ToolResult::success(
            serde_json::Value::String(text),
            start.elapsed().as_millis() as u64,
        ))
    }
}

/// Report what the code index holds
pub struct IndexStatsTool {
    definition: ToolDefinition,
    index: Arc<dyn CodeIndex>,
}

impl IndexStatsTool {
    /// Create the tool over an index
    #[must_use]
    pub fn new(index: Arc<dyn CodeIndex>) -> Self {
        let definition = ToolDefinition::new(
            "get_index_stats",
            "Show how many files and chunks the code index holds.",
        )
        .with_category(ToolCategory::Search)
        .with_risk_level(RiskLevel::Low);

        Self { definition, index }
    }
}

#[async_trait::async_trait]
impl Tool for IndexStatsTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();
        let stats = self
            .index
            .stats()
            .await
            .map_err(|e| Error::Execution(e.to_string()))?;
        Ok(ToolResult::success(
            serde_json::Value::String(stats.to_string()),
            start.elapsed().as_millis() as u64,
        ))
    }
}
