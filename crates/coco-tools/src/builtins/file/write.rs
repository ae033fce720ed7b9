use super::security;
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

/// Tool for writing file contents
pub struct WriteFileTool {
    definition: ToolDefinition,
    root: PathBuf,
}

impl WriteFileTool {
    /// Create a write tool confined to `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let definition = ToolDefinition::new(
            "write_file",
            "Write the full content of a file in the workspace, creating parent directories. \
             Overwrites existing files; read the file first and write back the complete new content.",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::High)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "Complete new file content"
                }
            },
            "required": ["path", "content"]
        }));

        Self {
            definition,
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for WriteFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let path = input
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'path' parameter".to_string()))?;
        let content = input
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'content' parameter".to_string()))?;

        let file_path = security::resolve_in_root(&self.root, path)?;
        if security::is_sensitive_file(&file_path) {
            warn!(path = %path, "Attempt to write credentials file");
            return Err(Error::PermissionDenied(format!(
                "Writing to '{path}' is restricted - file appears to hold secrets"
            )));
        }
        if file_path.is_dir() {
            return Err(Error::InvalidInput(format!("'{path}' is a directory")));
        }

        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file_path, content).await?;

        info!(path = %path, bytes = content.len(), "File written");
        Ok(ToolResult::success(
            serde_json::Value::String(format!("Wrote {} bytes to {path}", content.len())),
            start.elapsed().as_millis() as u64,
        ))
    }
}
