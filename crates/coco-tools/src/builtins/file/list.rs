use super::security;
use crate::error::Result;
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use std::path::PathBuf;
use std::time::Instant;
use tracing::debug;

/// Maximum entries returned for one directory
const MAX_ENTRIES: usize = 1000;

/// Tool for listing directory contents
pub struct ListDirectoryTool {
    definition: ToolDefinition,
    root: PathBuf,
}

impl ListDirectoryTool {
    /// Create a list tool confined to `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let definition = ToolDefinition::new(
            "list_directory",
            "List a directory in the workspace. Directories are marked [D], files [F] with their size.",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Directory to list (default: workspace root)"
                }
            }
        }));

        Self {
            definition,
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for ListDirectoryTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let path = input.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let dir_path = security::resolve_in_root(&self.root, path)?;

        debug!(path = %path, "Listing directory");

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&dir_path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let metadata = entry.metadata().await.ok();
            let is_dir = metadata.as_ref().is_some_and(std::fs::Metadata::is_dir);
            let size = metadata.as_ref().map_or(0, std::fs::Metadata::len);
            entries.push((is_dir, entry.file_name().to_string_lossy().into_owned(), size));
        }

        // Directories first, then by name
        entries.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let total = entries.len();
        let mut lines: Vec<String> = entries
            .into_iter()
            .take(MAX_ENTRIES)
            .map(|(is_dir, name, size)| {
                if is_dir {
                    format!("[D] {name}/")
                } else {
                    format!("[F] {name} ({size} bytes)")
                }
            })
            .collect();
        if total > MAX_ENTRIES {
            lines.push(format!("... {} more entries", total - MAX_ENTRIES));
        }
        if lines.is_empty() {
            lines.push("(empty directory)".to_string());
        }

        Ok(ToolResult::success(
            serde_json::Value::String(lines.join("\n")),
            start.elapsed().as_millis() as u64,
        ))
    }
}
