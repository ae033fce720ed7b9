//! Cache storage backends

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use lru::LruCache;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// A stored completion. Never mutated after insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Request fingerprint
    pub fingerprint: String,
    /// Model that produced the response
    pub model: String,
    /// Completion text
    pub response: String,
    /// When the entry was stored
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Create an entry stamped with the current time
    #[must_use]
    pub fn new(
        fingerprint: impl Into<String>,
        model: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            model: model.into(),
            response: response.into(),
            created_at: Utc::now(),
        }
    }
}

/// Key-value store behind the response cache
///
/// Implementations evict least-recently-used entries once `capacity` is
/// exceeded. A `get` hit counts as a use.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry, marking it recently used
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>>;

    /// Insert an entry; an existing entry with the same fingerprint is kept
    async fn put(&self, entry: CacheEntry) -> Result<()>;

    /// Number of stored entries
    async fn len(&self) -> Result<usize>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Backend name for status output
    fn backend(&self) -> &'static str;
}

/// In-process LRU store, lost on exit
pub struct MemoryCacheStore {
    entries: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCacheStore {
    /// Store holding at most `capacity` entries (minimum 1)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LruCache<String, CacheEntry>>> {
        self.entries
            .lock()
            .map_err(|e| Error::Cache(format!("cache lock poisoned: {e}")))
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, fingerprint: &str) -> Result<Option<CacheEntry>> {
        Ok(self.lock()?.get(fingerprint).cloned())
    }

    async fn put(&self, entry: CacheEntry) -> Result<()> {
        let mut entries = self.lock()?;
        if entries.contains(&entry.fingerprint) {
            entries.promote(&entry.fingerprint);
        } else {
            entries.put(entry.fingerprint.clone(), entry);
        }
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    async fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
