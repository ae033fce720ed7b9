//! Response cache
//!
//! Completions are stored under a fingerprint of (model, messages, params).
//! A hit never reaches the provider. Concurrent misses for the same
//! fingerprint are serialized through a per-fingerprint gate: the first
//! caller computes, later callers wait on the gate and then find the stored
//! entry. Distinct fingerprints never contend.
//!
//! Storage failures degrade to a miss (with a warning); they never fail the
//! request.

mod fingerprint;
mod sqlite;
mod store;

#[cfg(test)]
mod tests;

pub use fingerprint::{fingerprint, normalize_content};
pub use sqlite::SqliteCacheStore;
pub use store::{CacheEntry, CacheStore, MemoryCacheStore};

use crate::error::Result;
use coco_llm::{CompletionParams, Message};
use dashmap::DashMap;
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type Gate = Arc<Mutex<()>>;

/// Hit/miss counters since the cache was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the store
    pub hits: u64,
    /// Requests that had to be computed
    pub misses: u64,
}

/// Content-addressed completion cache
pub struct ResponseCache {
    store: Option<Arc<dyn CacheStore>>,
    in_flight: DashMap<String, Gate>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResponseCache {
    /// Cache over an arbitrary store
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self {
            store: Some(store),
            in_flight: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// In-process cache holding at most `capacity` entries
    #[must_use]
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(Arc::new(MemoryCacheStore::new(capacity)))
    }

    /// Persistent cache backed by SQLite
    ///
    /// # Errors
    /// Fails when the database cannot be opened.
    pub async fn open_sqlite(path: impl AsRef<Path>, capacity: usize) -> Result<Self> {
        let store = SqliteCacheStore::open(path, capacity).await?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Pass-through cache that always computes
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            store: None,
            in_flight: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Whether responses are stored at all
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Storage backend name
    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("disabled", |s| s.backend())
    }

    /// Hit/miss counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Stored entry count (0 when disabled or unreadable)
    pub async fn len(&self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };
        store.len().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to count cache entries");
            0
        })
    }

    /// Drop every stored entry
    ///
    /// # Errors
    /// Propagates storage failures.
    pub async fn clear(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.clear().await,
            None => Ok(()),
        }
    }

    /// Return the stored completion for this request, or run `compute`,
    /// store its output and return it
    ///
    /// `compute` runs at most once per fingerprint while the entry is
    /// cached. Failed computations are not stored.
    ///
    /// # Errors
    /// Only errors from `compute` are returned.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        model: &str,
        messages: &[Message],
        params: &CompletionParams,
        compute: F,
    ) -> std::result::Result<String, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<String, E>>,
    {
        let Some(store) = &self.store else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return compute().await;
        };

        let fp = fingerprint(model, messages, params);
        if let Some(text) = self.lookup(store.as_ref(), &fp).await {
            return Ok(text);
        }

        let slot = InFlight::acquire(&self.in_flight, &fp);
        let _guard = slot.gate.lock().await;

        // Another caller may have filled the entry while we waited
        if let Some(text) = self.lookup(store.as_ref(), &fp).await {
            return Ok(text);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let text = compute().await?;

        match store.put(CacheEntry::new(&fp, model, &text)).await {
            Ok(()) => info!(fingerprint = %short(&fp), model = %model, "Cache miss stored"),
            Err(e) => warn!(fingerprint = %short(&fp), error = %e, "Failed to store cache entry"),
        }
        Ok(text)
    }

    async fn lookup(&self, store: &dyn CacheStore, fp: &str) -> Option<String> {
        match store.get(fp).await {
            Ok(Some(entry)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(fingerprint = %short(fp), "Cache hit");
                Some(entry.response)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(fingerprint = %short(fp), error = %e, "Cache lookup failed, treating as miss");
                None
            }
        }
    }
}

fn short(fp: &str) -> &str {
    fp.get(..12).unwrap_or(fp)
}

/// Registration in the in-flight map, removed when the last holder leaves
///
/// Dropping also runs when the computing future is cancelled, so an
/// aborted turn never leaves a stale gate behind.
struct InFlight<'a> {
    map: &'a DashMap<String, Gate>,
    key: String,
    gate: Gate,
}

impl<'a> InFlight<'a> {
    fn acquire(map: &'a DashMap<String, Gate>, key: &str) -> Self {
        let gate = map
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            map,
            key: key.to_string(),
            gate,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // Two references remain when nobody else waits: the map's and ours
        self.map.remove_if(&self.key, |_, gate| {
            Arc::ptr_eq(gate, &self.gate) && Arc::strong_count(gate) <= 2
        });
    }
}
