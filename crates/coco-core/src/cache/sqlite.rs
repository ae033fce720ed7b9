//! SQLite cache persistence
//!
//! Entries survive process restarts. Recency is tracked with a monotonic
//! `last_access` sequence rather than wall-clock time, so eviction order is
//! exact even when several hits land in the same millisecond.

use super::store::{CacheEntry, CacheStore};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::{debug, info};

/// Persistent LRU store
pub struct SqliteCacheStore {
    pool: SqlitePool,
    capacity: usize,
    access_seq: AtomicI64,
}

impl SqliteCacheStore {
    /// Open (or create) the store at `path`
    ///
    /// # Errors
    /// Returns [`Error::Cache`] when the directory, database or schema cannot
    /// be created.
    pub async fn open(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Cache(format!("Failed to create cache directory: {e}")))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
            .map_err(|e| Error::Cache(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| Error::Cache(format!("Failed to open cache database: {e}")))?;

        let store = Self {
            pool,
            capacity: capacity.max(1),
            access_seq: AtomicI64::new(0),
        };
        store.init_schema().await?;

        let (max_seq,): (i64,) =
            sqlx::query_as("SELECT COALESCE(MAX(last_access), 0) FROM llm_cache")
                .fetch_one(&store.pool)
                .await
                .map_err(|e| Error::Cache(format!("Failed to read access sequence: {e}")))?;
        store.access_seq.store(max_seq, Ordering::SeqCst);

        info!(path = %path.display(), capacity = store.capacity, "Response cache opened");
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS llm_cache (
                fingerprint TEXT PRIMARY KEY,
                model TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_access INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Cache(format!("Failed to create cache table: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_llm_cache_access ON llm_cache(last_access)")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Cache(format!("Failed to create cache index: {e}")))?;

        Ok(())
    }

    fn next_seq(&self) -> i64 {
        self.access_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn evict_overflow(&self) -> Result<()> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM llm_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Cache(format!("Failed to count cache entries: {e}")))?;

        let overflow = count - self.capacity as i64;
        if overflow <= 0 {
            return Ok(());
        }

        sqlx::query(
            r#"
            DELETE FROM llm_cache WHERE fingerprint IN (
                SELECT fingerprint FROM llm_cache ORDER BY last_access ASC LIMIT ?
            )
            "#,
        )
        .bind(overflow)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Cache(format!("Failed to evict cache entries: {e}")))?;

        debug!(evicted = overflow, "Evicted least recently used cache entries");
        Ok(())
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT model, response, created_at FROM llm_cache WHERE fingerprint = ?",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Cache(format!("Failed to read cache entry: {e}")))?;

        let Some((model, response, created_at)) = row else {
            return Ok(None);
        };

        sqlx::query("UPDATE llm_cache SET last_access = ? WHERE fingerprint = ?")
            .bind(self.next_seq())
            .bind(fingerprint)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Cache(format!("Failed to touch cache entry: {e}")))?;

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| Error::Cache(format!("Corrupt cache timestamp: {e}")))?;

        Ok(Some(CacheEntry {
            fingerprint: fingerprint.to_string(),
            model,
            response,
            created_at,
        }))
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO llm_cache (fingerprint, model, response, created_at, last_access)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.fingerprint)
        .bind(&entry.model)
        .bind(&entry.response)
        .bind(entry.created_at.to_rfc3339())
        .bind(self.next_seq())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Cache(format!("Failed to store cache entry: {e}")))?;

        self.evict_overflow().await
    }

    async fn len(&self) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM llm_cache")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Error::Cache(format!("Failed to count cache entries: {e}")))?;
        Ok(count.max(0) as usize)
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM llm_cache")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Cache(format!("Failed to clear cache: {e}")))?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "sqlite"
    }
}
