use super::security;
use crate::error::{Error, Result};
use crate::registry::{RiskLevel, Tool, ToolCategory, ToolDefinition, ToolResult};
use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

/// Maximum matching lines reported
pub const MAX_MATCHES: usize = 100;

/// Files larger than this are not searched
const MAX_FILE_BYTES: u64 = 1_048_576;

/// Matched lines longer than this are cut
const MAX_LINE_CHARS: usize = 200;

/// Tool for regex search over workspace text files
pub struct SearchInFilesTool {
    definition: ToolDefinition,
    root: PathBuf,
}

impl SearchInFilesTool {
    /// Create a search tool confined to `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let definition = ToolDefinition::new(
            "search_in_files",
            "Search workspace text files for a regular expression. Returns up to 100 matching \
             lines as path:line: text. Respects .gitignore.",
        )
        .with_category(ToolCategory::File)
        .with_risk_level(RiskLevel::Low)
        .with_parameters(serde_json::json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regular expression to search for"
                },
                "path": {
                    "type": "string",
                    "description": "Directory to search (default: workspace root)"
                },
                "glob": {
                    "type": "string",
                    "description": "Only search files matching this glob, e.g. *.py"
                }
            },
            "required": ["pattern"]
        }));

        Self {
            definition,
            root: root.into(),
        }
    }
}

#[async_trait::async_trait]
impl Tool for SearchInFilesTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult> {
        let start = Instant::now();

        let pattern = input
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::InvalidInput("Missing 'pattern' parameter".to_string()))?;
        let regex = Regex::new(pattern)
            .map_err(|e| Error::InvalidInput(format!("Invalid pattern: {e}")))?;

        let path = input.get("path").and_then(|v| v.as_str()).unwrap_or(".");
        let search_root = security::resolve_in_root(&self.root, path)?;
        let glob = input
            .get("glob")
            .and_then(|v| v.as_str())
            .map(ToString::to_string);

        debug!(pattern = %pattern, path = %path, glob = ?glob, "Searching files");

        let display_root = self.root.canonicalize().unwrap_or_else(|_| self.root.clone());
        let matches = tokio::task::spawn_blocking(move || {
            search_blocking(&regex, &search_root, &display_root, glob.as_deref())
        })
        .await
        .map_err(|e| Error::Execution(e.to_string()))??;

        let text = if matches.is_empty() {
            format!("No matches for '{pattern}'")
        } else {
            let mut text = matches.join("\n");
            if matches.len() >= MAX_MATCHES {
                text.push_str(&format!("\n[stopped after {MAX_MATCHES} matches]"));
            }
            text
        };

        Ok(ToolResult::success(
            serde_json::Value::String(text),
            start.elapsed().as_millis() as u64,
        ))
    }
}

fn search_blocking(
    regex: &Regex,
    search_root: &Path,
    display_root: &Path,
    glob: Option<&str>,
) -> Result<Vec<String>> {
    let mut builder = WalkBuilder::new(search_root);
    builder.require_git(false);
    builder.sort_by_file_name(|a, b| a.cmp(b));
    if let Some(glob) = glob {
        let overrides = OverrideBuilder::new(search_root)
            .add(glob)
            .and_then(|b| b.build())
            .map_err(|e| Error::InvalidInput(format!("Invalid glob: {e}")))?;
        builder.overrides(overrides);
    }

    let mut matches = Vec::new();
    for entry in builder.build().filter_map(std::result::Result::ok) {
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        if entry.metadata().map_or(true, |m| m.len() > MAX_FILE_BYTES) {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(entry.path()) else {
            continue;
        };

        let shown = entry
            .path()
            .strip_prefix(display_root)
            .unwrap_or(entry.path())
            .display()
            .to_string();
        for (number, line) in content.lines().enumerate() {
            if regex.is_match(line) {
                let line: String = line.trim().chars().take(MAX_LINE_CHARS).collect();
                matches.push(format!("{shown}:{}: {line}", number + 1));
                if matches.len() >= MAX_MATCHES {
                    return Ok(matches);
                }
            }
        }
    }
    Ok(matches)
}
