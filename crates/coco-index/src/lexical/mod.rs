//! Lexical repository index
//!
//! Files are split into overlapping windows, each window is reduced to term
//! frequencies, and queries are ranked with BM25. The whole index is a single
//! JSON document under the persistence directory, rewritten atomically after
//! every rebuild or update.

mod scoring;

#[cfg(test)]
mod tests;

pub use scoring::{terms, CorpusStats};

use crate::chunk::{split_into_chunks, IndexChunk, ScoredChunk};
use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::walker::{collect_files, relative_key};
use crate::{CodeIndex, IndexReport, IndexStats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

/// On-disk file name inside the persistence directory
pub const INDEX_FILE: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredChunk {
    chunk: IndexChunk,
    terms: HashMap<String, u32>,
    length: u32,
}

impl StoredChunk {
    fn new(chunk: IndexChunk) -> Self {
        let terms = scoring::term_frequencies(&chunk.text);
        let length = terms.values().sum();
        Self {
            chunk,
            terms,
            length,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexData {
    version: u32,
    updated_at: DateTime<Utc>,
    chunks: Vec<StoredChunk>,
}

struct IndexState {
    data: IndexData,
    stats: CorpusStats,
}

impl IndexState {
    fn new(data: IndexData) -> Self {
        let mut stats = CorpusStats {
            docs: data.chunks.len(),
            ..Default::default()
        };
        let mut total_len = 0u64;
        for stored in &data.chunks {
            total_len += u64::from(stored.length);
            for term in stored.terms.keys() {
                *stats.doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }
        stats.avg_len = if data.chunks.is_empty() {
            0.0
        } else {
            total_len as f32 / data.chunks.len() as f32
        };
        Self { data, stats }
    }
}

/// BM25 index over repository chunks
pub struct LexicalIndex {
    config: IndexConfig,
    state: RwLock<Option<IndexState>>,
}

impl LexicalIndex {
    /// Open the index for a root, loading a persisted index if one exists
    ///
    /// A missing or unreadable index file leaves the index unbuilt; queries
    /// then answer [`Error::Unavailable`] until [`CodeIndex::rebuild`] runs.
    pub async fn open(config: IndexConfig) -> Result<Self> {
        let path = config.resolved_persist_dir().join(INDEX_FILE);
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<IndexData>(&bytes) {
                Ok(data) if data.version == FORMAT_VERSION => {
                    info!(path = %path.display(), chunks = data.chunks.len(), "Loaded code index");
                    Some(IndexState::new(data))
                }
                Ok(data) => {
                    warn!(path = %path.display(), version = data.version, "Ignoring index with unknown format version");
                    None
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unreadable code index");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(Error::Io(e)),
        };

        Ok(Self {
            config,
            state: RwLock::new(state),
        })
    }

    /// Index configuration
    #[must_use]
    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Whether an index has been built or loaded
    pub async fn is_built(&self) -> bool {
        self.state.read().await.is_some()
    }

    fn index_path(&self) -> PathBuf {
        self.config.resolved_persist_dir().join(INDEX_FILE)
    }

    async fn persist(&self, data: &IndexData) -> Result<()> {
        let dir = self.config.resolved_persist_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let bytes = serde_json::to_vec(data).map_err(|e| Error::Serialization(e.to_string()))?;
        let tmp = dir.join(format!("{INDEX_FILE}.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, self.index_path()).await?;
        Ok(())
    }

    /// Chunk the given absolute paths on a blocking thread
    async fn chunk_files(&self, files: Vec<PathBuf>) -> Result<(Vec<StoredChunk>, IndexReport)> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || chunk_files_blocking(&config, &files))
            .await
            .map_err(|e| Error::Task(e.to_string()))
    }
}

fn chunk_files_blocking(config: &IndexConfig, files: &[PathBuf]) -> (Vec<StoredChunk>, IndexReport) {
    let mut chunks = Vec::new();
    let mut report = IndexReport::default();

    for path in files {
        let Ok(key) = relative_key(&config.root, path) else {
            report.files_skipped += 1;
            continue;
        };
        let too_big = std::fs::metadata(path)
            .map(|m| m.len() > config.max_file_bytes)
            .unwrap_or(true);
        if too_big {
            report.files_skipped += 1;
            continue;
        }
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Skipping unreadable file");
                report.files_skipped += 1;
                continue;
            }
        };

        let file_chunks =
            split_into_chunks(&key, &content, config.chunk_size, config.chunk_overlap);
        report.files_processed += 1;
        report.chunks_created += file_chunks.len();
        chunks.extend(file_chunks.into_iter().map(StoredChunk::new));
    }

    (chunks, report)
}

fn absolute(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[async_trait::async_trait]
impl CodeIndex for LexicalIndex {
    #[instrument(skip(self), fields(root = %self.config.root.display()))]
    async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or_else(|| {
            Error::Unavailable("codebase has not been indexed; run /index first".to_string())
        })?;

        let query = scoring::terms(text);
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = state
            .data
            .chunks
            .iter()
            .filter_map(|stored| {
                let path_terms = scoring::terms(&stored.chunk.path);
                let score = state
                    .stats
                    .score(&query, &stored.terms, stored.length, &path_terms);
                (score > 0.0).then(|| ScoredChunk {
                    chunk: stored.chunk.clone(),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk.path.cmp(&b.chunk.path))
                .then_with(|| a.chunk.byte_range.start.cmp(&b.chunk.byte_range.start))
        });
        scored.truncate(k);

        debug!(terms = query.len(), hits = scored.len(), "Index query answered");
        Ok(scored)
    }

    #[instrument(skip(self, paths), fields(paths = paths.len()))]
    async fn update(&self, paths: &[PathBuf]) -> Result<IndexReport> {
        if self.state.read().await.is_none() {
            return Err(Error::Unavailable(
                "codebase has not been indexed; run /index first".to_string(),
            ));
        }

        let mut keys = HashSet::new();
        let mut present = Vec::new();
        for path in paths {
            let abs = absolute(&self.config.root, path);
            keys.insert(relative_key(&self.config.root, &abs)?);
            if abs.is_file() && self.config.is_included_file(&abs) {
                present.push(abs);
            }
        }

        let (fresh, report) = self.chunk_files(present).await?;

        let mut guard = self.state.write().await;
        let Some(state) = guard.take() else {
            return Err(Error::Unavailable("index was reset during update".to_string()));
        };
        let mut data = state.data;
        data.chunks.retain(|stored| !keys.contains(&stored.chunk.path));
        data.chunks.extend(fresh);
        data.updated_at = Utc::now();

        let persisted = self.persist(&data).await;
        *guard = Some(IndexState::new(data));
        persisted?;

        info!(
            files = report.files_processed,
            chunks = report.chunks_created,
            "Code index updated"
        );
        Ok(report)
    }

    #[instrument(skip(self), fields(root = %self.config.root.display()))]
    async fn rebuild(&self) -> Result<IndexReport> {
        let config = self.config.clone();
        let files = tokio::task::spawn_blocking(move || collect_files(&config))
            .await
            .map_err(|e| Error::Task(e.to_string()))?;

        let (chunks, report) = self.chunk_files(files).await?;
        let data = IndexData {
            version: FORMAT_VERSION,
            updated_at: Utc::now(),
            chunks,
        };

        self.persist(&data).await?;
        *self.state.write().await = Some(IndexState::new(data));

        info!(
            files = report.files_processed,
            chunks = report.chunks_created,
            skipped = report.files_skipped,
            "Code index rebuilt"
        );
        Ok(report)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or_else(|| {
            Error::Unavailable("index not found; run /index to build it".to_string())
        })?;

        let files: HashSet<&str> = state
            .data
            .chunks
            .iter()
            .map(|s| s.chunk.path.as_str())
            .collect();

        Ok(IndexStats {
            files: files.len(),
            chunks: state.data.chunks.len(),
            backend: "lexical".to_string(),
            path: self.config.resolved_persist_dir(),
            updated_at: state.data.updated_at,
        })
    }
}
