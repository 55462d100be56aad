//! Tests for [`ResponseCache`]: LRU + TTL store of merged completion results.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use muninn::cache::{CacheConfig, ResponseCache};
use muninn::{
    CompletionCandidate, CompletionRequest, CompletionResult, Fingerprint, Language, ProviderKind,
    RequestLimits,
};

fn fingerprint(code: &str) -> Fingerprint {
    let request = CompletionRequest::builder(code, Language::Python)
        .build(&RequestLimits::default())
        .unwrap();
    Fingerprint::of(&request)
}

fn make_result(text: &str) -> Arc<CompletionResult> {
    Arc::new(CompletionResult {
        candidates: vec![CompletionCandidate::from_provider(text, ProviderKind::RuleBased)],
        reasoning: "test".into(),
        model_used: ProviderKind::RuleBased,
        processing_time: Duration::from_millis(3),
    })
}

// =========================================================================
// CacheConfig
// =========================================================================

#[test]
fn cache_config_defaults() {
    let config = CacheConfig::default();
    assert_eq!(config.max_entries, 1_000);
    assert_eq!(config.ttl, Duration::from_secs(3600));
}

#[test]
fn cache_config_builder() {
    let config = CacheConfig::new()
        .max_entries(500)
        .ttl(Duration::from_secs(60));
    assert_eq!(config.max_entries, 500);
    assert_eq!(config.ttl, Duration::from_secs(60));
}

// =========================================================================
// Lookup and insert
// =========================================================================

#[tokio::test]
async fn miss_then_hit() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let fp = fingerprint("x = ");

    assert!(cache.get(&fp).await.is_none());
    cache.insert(fp.clone(), make_result("1")).await;

    let hit = cache.get(&fp).await.unwrap();
    assert_eq!(hit.suggestions().collect::<Vec<_>>(), vec!["1"]);
}

#[tokio::test]
async fn hit_returns_the_stored_value() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let fp = fingerprint("x = ");
    let stored = make_result("1");
    cache.insert(fp.clone(), Arc::clone(&stored)).await;

    let first = cache.get(&fp).await.unwrap();
    let second = cache.get(&fp).await.unwrap();
    assert!(Arc::ptr_eq(&first, &stored));
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn entries_expire_after_ttl() {
    let cache = ResponseCache::new(&CacheConfig::new().ttl(Duration::from_millis(50)));
    let fp = fingerprint("x = ");
    cache.insert(fp.clone(), make_result("1")).await;
    assert!(cache.get(&fp).await.is_some());

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(cache.get(&fp).await.is_none());
}

#[tokio::test]
async fn oldest_entry_is_evicted_when_full() {
    let cache = ResponseCache::new(&CacheConfig::new().max_entries(2));
    let (a, b, c) = (fingerprint("a"), fingerprint("b"), fingerprint("c"));

    cache.insert(a.clone(), make_result("a")).await;
    cache.insert(b.clone(), make_result("b")).await;
    cache.insert(c.clone(), make_result("c")).await;

    assert_eq!(cache.len().await, 2);
    assert!(!cache.contains(&a));
    assert!(cache.contains(&b));
    assert!(cache.contains(&c));
}

#[tokio::test]
async fn invalidate_and_clear() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let (a, b) = (fingerprint("a"), fingerprint("b"));
    cache.insert(a.clone(), make_result("a")).await;
    cache.insert(b.clone(), make_result("b")).await;

    cache.invalidate(&a).await;
    assert!(cache.get(&a).await.is_none());
    assert!(cache.get(&b).await.is_some());

    cache.clear();
    assert!(cache.is_empty().await);
}

// =========================================================================
// get_or_compute
// =========================================================================

#[tokio::test]
async fn get_or_compute_runs_once_then_hits() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let fp = fingerprint("x = ");
    let runs = &AtomicU32::new(0);

    let compute = || async move {
        runs.fetch_add(1, Ordering::SeqCst);
        make_result("1")
    };

    let (first, fresh) = cache.get_or_compute(&fp, compute()).await;
    assert!(fresh);
    let (second, fresh) = cache.get_or_compute(&fp, compute()).await;
    assert!(!fresh);

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&first, &second));
}

#[tokio::test]
async fn concurrent_get_or_compute_shares_one_computation() {
    let cache = ResponseCache::new(&CacheConfig::default());
    let fp = fingerprint("x = ");
    let runs = &AtomicU32::new(0);

    let calls = (0..8).map(|_| {
        cache.get_or_compute(&fp, async move {
            runs.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            make_result("1")
        })
    });
    let results = futures_util::future::join_all(calls).await;

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(results.iter().filter(|(_, fresh)| *fresh).count(), 1);
    assert!(results.iter().all(|(r, _)| Arc::ptr_eq(r, &results[0].0)));
}
