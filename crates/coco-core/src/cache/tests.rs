use super::*;
use std::sync::atomic::AtomicUsize;
use std::time::Duration;

fn request() -> (Vec<Message>, CompletionParams) {
    (
        vec![
            Message::system("You answer questions about code."),
            Message::user("what does main.py do?"),
        ],
        CompletionParams::default(),
    )
}

async fn counted(calls: &AtomicUsize, text: &str) -> std::result::Result<String, String> {
    calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(text.to_string())
}

#[tokio::test]
async fn test_second_identical_request_is_a_hit() {
    let cache = ResponseCache::in_memory(10);
    let (messages, params) = request();
    let calls = AtomicUsize::new(0);

    let first = cache
        .get_or_compute("m", &messages, &params, || counted(&calls, "answer"))
        .await
        .unwrap();
    let second = cache
        .get_or_compute("m", &messages, &params, || counted(&calls, "different"))
        .await
        .unwrap();

    assert_eq!(first, "answer");
    assert_eq!(second, "answer");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_concurrent_identical_requests_compute_once() {
    let cache = Arc::new(ResponseCache::in_memory(10));
    let calls = Arc::new(AtomicUsize::new(0));

    let handles = (0..8).map(|_| {
        let cache = Arc::clone(&cache);
        let calls = Arc::clone(&calls);
        tokio::spawn(async move {
            let (messages, params) = request();
            cache
                .get_or_compute("m", &messages, &params, || counted(&calls, "once"))
                .await
        })
    });
    for result in futures::future::join_all(handles).await {
        assert_eq!(result.unwrap().unwrap(), "once");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(cache.in_flight.is_empty());
}

#[tokio::test]
async fn test_distinct_fingerprints_do_not_serialize() {
    let cache = Arc::new(ResponseCache::in_memory(10));
    let started = std::time::Instant::now();

    let mut handles = Vec::new();
    for i in 0..4 {
        let cache = Arc::clone(&cache);
        handles.push(tokio::spawn(async move {
            let messages = vec![Message::user(format!("question {i}"))];
            cache
                .get_or_compute("m", &messages, &CompletionParams::default(), || async {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    Ok::<_, String>(format!("answer {i}"))
                })
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(started.elapsed() < Duration::from_millis(700));
    assert_eq!(cache.len().await, 4);
}

#[tokio::test]
async fn test_failed_compute_is_not_cached() {
    let cache = ResponseCache::in_memory(10);
    let (messages, params) = request();

    let failed: std::result::Result<String, String> = cache
        .get_or_compute("m", &messages, &params, || async { Err("boom".to_string()) })
        .await;
    assert_eq!(failed.unwrap_err(), "boom");
    assert_eq!(cache.len().await, 0);

    let calls = AtomicUsize::new(0);
    let text = cache
        .get_or_compute("m", &messages, &params, || counted(&calls, "recovered"))
        .await
        .unwrap();
    assert_eq!(text, "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_cache_always_computes() {
    let cache = ResponseCache::disabled();
    let (messages, params) = request();
    let calls = AtomicUsize::new(0);

    for _ in 0..2 {
        cache
            .get_or_compute("m", &messages, &params, || counted(&calls, "x"))
            .await
            .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(!cache.is_enabled());
    assert_eq!(cache.backend(), "disabled");
}

#[tokio::test]
async fn test_memory_store_evicts_least_recently_used() {
    let store = MemoryCacheStore::new(2);
    store.put(CacheEntry::new("a", "m", "A")).await.unwrap();
    store.put(CacheEntry::new("b", "m", "B")).await.unwrap();
    // touch "a" so "b" becomes the eviction candidate
    assert!(store.get("a").await.unwrap().is_some());
    store.put(CacheEntry::new("c", "m", "C")).await.unwrap();

    assert!(store.get("a").await.unwrap().is_some());
    assert!(store.get("b").await.unwrap().is_none());
    assert!(store.get("c").await.unwrap().is_some());
}

#[tokio::test]
async fn test_entries_are_never_overwritten() {
    let store = MemoryCacheStore::new(4);
    store.put(CacheEntry::new("a", "m", "first")).await.unwrap();
    store.put(CacheEntry::new("a", "m", "second")).await.unwrap();
    assert_eq!(store.get("a").await.unwrap().unwrap().response, "first");
}

#[tokio::test]
async fn test_sqlite_store_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cache").join("llm_cache.db");
    let (messages, params) = request();
    let calls = AtomicUsize::new(0);

    {
        let cache = ResponseCache::open_sqlite(&path, 10).await.unwrap();
        cache
            .get_or_compute("m", &messages, &params, || counted(&calls, "persisted"))
            .await
            .unwrap();
        assert_eq!(cache.backend(), "sqlite");
    }

    let reopened = ResponseCache::open_sqlite(&path, 10).await.unwrap();
    let text = reopened
        .get_or_compute("m", &messages, &params, || counted(&calls, "recomputed"))
        .await
        .unwrap();
    assert_eq!(text, "persisted");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sqlite_store_evicts_least_recently_used() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteCacheStore::open(dir.path().join("c.db"), 2)
        .await
        .unwrap();

    store.put(CacheEntry::new("a", "m", "A")).await.unwrap();
    store.put(CacheEntry::new("b", "m", "B")).await.unwrap();
    assert_eq!(store.get("a").await.unwrap().unwrap().response, "A");
    store.put(CacheEntry::new("c", "m", "C")).await.unwrap();

    assert_eq!(store.len().await.unwrap(), 2);
    assert!(store.get("b").await.unwrap().is_none());
    assert!(store.get("a").await.unwrap().is_some());

    store.put(CacheEntry::new("a", "m", "changed")).await.unwrap();
    assert_eq!(store.get("a").await.unwrap().unwrap().response, "A");

    store.clear().await.unwrap();
    assert_eq!(store.len().await.unwrap(), 0);
}

struct BrokenStore;

#[async_trait::async_trait]
impl CacheStore for BrokenStore {
    async fn get(&self, _fingerprint: &str) -> Result<Option<CacheEntry>> {
        Err(crate::Error::Cache("disk gone".to_string()))
    }
    async fn put(&self, _entry: CacheEntry) -> Result<()> {
        Err(crate::Error::Cache("disk gone".to_string()))
    }
    async fn len(&self) -> Result<usize> {
        Err(crate::Error::Cache("disk gone".to_string()))
    }
    async fn clear(&self) -> Result<()> {
        Ok(())
    }
    fn backend(&self) -> &'static str {
        "broken"
    }
}

#[tokio::test]
async fn test_store_failures_degrade_to_compute() {
    let cache = ResponseCache::new(Arc::new(BrokenStore));
    let (messages, params) = request();
    let calls = AtomicUsize::new(0);

    let text = cache
        .get_or_compute("m", &messages, &params, || counted(&calls, "live"))
        .await
        .unwrap();
    assert_eq!(text, "live");
    assert_eq!(cache.len().await, 0);
}
