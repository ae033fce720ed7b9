use super::security;
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use std::path::PathBuf;
use std::time::Instant;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Default read limit in bytes
const DEFAULT_MAX_BYTES: u64 = 100_000;

/// Largest read a caller may request
const MAX_READ_BYTES: u64 = 1_000_000;

/// Tool for reading file contents
pub struct ReadFileTool {
    definition: ToolDefinition,
    root: PathBuf,
}

impl ReadFileTool {
    /// Create a read tool confined to `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let definition = ToolDefinition::new(
            "read_file",
            "Read the contents of a file in the workspace. Paths are relative to the workspace root.",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path to the file to read"
                },
                "max_bytes": {
                    "type": "integer",
                    "description": "Maximum bytes to read (default: 100000, at most 1000000)"
                }
            },
            "required": ["path"]
        }));

        Self {
            definition,
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for ReadFileTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let path = input
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'path' parameter".to_string()))?;

        let file_path = security::resolve_in_root(&self.root, path)?;
        if security::is_sensitive_file(&file_path) {
            warn!(path = %path, "Attempt to read credentials file");
            return Err(Error::PermissionDenied(format!(
                "Reading '{path}' is restricted - file appears to contain secrets"
            )));
        }

        let max_bytes = input
            .get("max_bytes")
            .and_then(|v| v.as_u64())
            .unwrap_or(DEFAULT_MAX_BYTES)
            .clamp(1, MAX_READ_BYTES);

        debug!(path = %path, max_bytes, "Reading file");

        let file = tokio::fs::File::open(&file_path).await?;
        let mut contents = Vec::new();
        file.take(max_bytes.saturating_add(1)).read_to_end(&mut contents).await?;

        let truncated = contents.len() as u64 > max_bytes;
        if truncated {
            contents.truncate(max_bytes as usize);
        }

        let mut text = String::from_utf8_lossy(&contents).into_owned();
        if truncated {
            text.push_str(&format!("\n[truncated after {max_bytes} bytes]"));
        }

        Ok(ToolResult::success(
            serde_json::Value::String(text),
            start.elapsed().as_millis() as u64,
        ))
    }
}
