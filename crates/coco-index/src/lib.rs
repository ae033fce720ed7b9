//! Coco Index - repository search capability
//!
//! Agents consume the index only through the [`CodeIndex`] trait:
//! - `query`: ranked chunks for a text query
//! - `update`: re-index specific changed files
//! - `rebuild`: re-index the whole working directory
//! - `stats`: what is currently indexed
//!
//! [`LexicalIndex`] is the built-in implementation. It chunks files into
//! overlapping windows and ranks them with BM25 over identifier terms,
//! persisting to `<persist_dir>/index.json`. An embedding-backed index can
//! implement the same trait.
//!
//! # Example
//!
//! ```ignore
//! use coco_index::{CodeIndex, IndexConfig, LexicalIndex};
//!
//! let index = LexicalIndex::open(IndexConfig::new(".")).await?;
//! index.rebuild().await?;
//! for hit in index.query("parse arguments", 5).await? {
//!     println!("{} {:?} {:.2}", hit.chunk.path, hit.chunk.byte_range, hit.score);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod chunk;
pub mod config;
pub mod error;
pub mod lexical;
pub mod walker;

pub use chunk::{IndexChunk, ScoredChunk};
pub use config::IndexConfig;
pub use error::{Error, Result};
pub use lexical::LexicalIndex;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of a rebuild or partial update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    /// Files read during this pass
    pub files_processed: usize,
    /// Chunks produced during this pass
    pub chunks_created: usize,
    /// Files that were skipped (unreadable or not UTF-8)
    pub files_skipped: usize,
}

/// Snapshot of what the index currently holds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Distinct indexed files
    pub files: usize,
    /// Indexed chunks
    pub chunks: usize,
    /// Backend name
    pub backend: String,
    /// Where the index is persisted
    pub path: PathBuf,
    /// When the index was last (re)built
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl std::fmt::Display for IndexStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Indexed: {} chunks from {} files | Backend: {} | Path: {}",
            self.chunks,
            self.files,
            self.backend,
            self.path.display()
        )
    }
}

/// Semantic or lexical search over repository chunks
///
/// Queries are read-only. An index that has never been built answers
/// [`Error::Unavailable`] so callers can degrade instead of failing.
#[async_trait::async_trait]
pub trait CodeIndex: Send + Sync {
    /// Chunks most relevant to `text`, best first, at most `k`
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>>;

    /// Re-index the given files (relative to the index root or absolute)
    async fn update(&self, paths: &[PathBuf]) -> Result<IndexReport>;

    /// Re-index everything under the root
    async fn rebuild(&self) -> Result<IndexReport>;

    /// Current index statistics
    async fn stats(&self) -> Result<IndexStats>;
}
