//! Index configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Extensions indexed by default
pub const DEFAULT_INCLUDE_EXTENSIONS: &[&str] = &[
    ".py", ".ts", ".js", ".tsx", ".jsx", ".go", ".rs", ".java", ".rb", ".cpp", ".c", ".h", ".cs",
    ".php", ".swift", ".kt", ".md", ".txt", ".yaml", ".yml", ".toml", ".json", ".env.example",
    ".sh", ".bash", ".zsh", ".sql",
];

/// Directories skipped by default (`*` prefix matches a suffix)
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git", "node_modules", "__pycache__", ".venv", "venv", ".env", "dist", "build", "target",
    ".coco_index", ".mypy_cache", ".ruff_cache", "coverage", ".coverage", "htmlcov", ".tox",
    "eggs", "*.egg-info",
];

/// Configuration for a repository index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Directory being indexed
    pub root: PathBuf,
    /// Where the index is persisted (relative paths are under `root`)
    pub persist_dir: PathBuf,
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
    /// File suffixes to index
    pub include_extensions: Vec<String>,
    /// Directory names to skip
    pub exclude_dirs: Vec<String>,
    /// Files larger than this are skipped
    pub max_file_bytes: u64,
}

impl IndexConfig {
    /// Default configuration for a root directory
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            persist_dir: PathBuf::from(".coco_index"),
            chunk_size: 1000,
            chunk_overlap: 200,
            include_extensions: DEFAULT_INCLUDE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|s| (*s).to_string()).collect(),
            max_file_bytes: 1_048_576,
        }
    }

    /// Set the persistence directory
    #[must_use]
    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = dir.into();
        self
    }

    /// Set chunk size and overlap
    #[must_use]
    pub fn with_chunking(mut self, chunk_size: usize, chunk_overlap: usize) -> Self {
        self.chunk_size = chunk_size;
        self.chunk_overlap = chunk_overlap;
        self
    }

    /// Set included extensions
    #[must_use]
    pub fn with_include_extensions(mut self, extensions: Vec<String>) -> Self {
        self.include_extensions = extensions;
        self
    }

    /// Set excluded directories
    #[must_use]
    pub fn with_exclude_dirs(mut self, dirs: Vec<String>) -> Self {
        self.exclude_dirs = dirs;
        self
    }

    /// Absolute persistence directory
    #[must_use]
    pub fn resolved_persist_dir(&self) -> PathBuf {
        if self.persist_dir.is_absolute() {
            self.persist_dir.clone()
        } else {
            self.root.join(&self.persist_dir)
        }
    }

    /// Whether a file name has an included suffix
    #[must_use]
    pub fn is_included_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.include_extensions
            .iter()
            .any(|ext| name.ends_with(ext.as_str()))
    }

    /// Whether a directory name is excluded
    #[must_use]
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => name == pattern,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_and_exclude_rules() {
        let config = IndexConfig::new("/repo");

        assert!(config.is_included_file(Path::new("src/main.rs")));
        assert!(config.is_included_file(Path::new("config/.env.example")));
        assert!(!config.is_included_file(Path::new("logo.png")));

        assert!(config.is_excluded_dir("node_modules"));
        assert!(config.is_excluded_dir("coco.egg-info"));
        assert!(!config.is_excluded_dir("src"));
    }

    #[test]
    fn test_persist_dir_resolution() {
        let config = IndexConfig::new("/repo");
        assert_eq!(config.resolved_persist_dir(), PathBuf::from("/repo/.coco_index"));

        let config = config.with_persist_dir("/var/cache/coco");
        assert_eq!(config.resolved_persist_dir(), PathBuf::from("/var/cache/coco"));
    }
}
