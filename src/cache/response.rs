//! Bounded response cache with single-flight computation.
//!
//! [`ResponseCache`] maps a request [`Fingerprint`] to the merged
//! [`CompletionResult`] computed for it. Entries expire once older than the
//! configured TTL and the least recently used entry is evicted when the
//! cache is full; with no reads in between, that is the earliest insert.
//!
//! # Single-flight
//!
//! [`ResponseCache::get_or_compute`] runs the supplied computation at most
//! once per fingerprint at a time. Concurrent callers for the same
//! fingerprint wait for the in-flight computation and receive its result.
//! If the computing caller is dropped before finishing, nothing is inserted
//! and one of the waiters takes over; partial work never reaches the cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::fingerprint::Fingerprint;
use crate::telemetry;
use crate::types::CompletionResult;

/// Configuration for the response cache.
///
/// ```rust
/// # use muninn::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(10_000)
///     .ttl(Duration::from_secs(600));
/// ```
/// Longest accepted entry lifetime (one year).
pub const MAX_CACHE_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries; 0 disables caching. Default: 1,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Whether this config allocates a cache at all.
    pub fn is_enabled(&self) -> bool {
        self.max_entries > 0
    }
}

/// A cached result and when it was computed.
#[derive(Debug)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub result: Arc<CompletionResult>,
    pub created: Instant,
}

impl CacheEntry {
    fn new(fingerprint: Fingerprint, result: Arc<CompletionResult>) -> Self {
        Self {
            fingerprint,
            result,
            created: Instant::now(),
        }
    }

    /// True once the entry is strictly older than `ttl` at `now`.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created) > ttl
    }
}

/// In-memory LRU + TTL cache of completion results.
pub struct ResponseCache {
    cache: Cache<Fingerprint, Arc<CacheEntry>>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self {
            cache,
            ttl: config.ttl,
        }
    }

    /// Look up a cached result without computing anything.
    ///
    /// Returns `None` on miss or if the entry has expired. Emits cache
    /// hit/miss metrics.
    pub async fn get(&self, fingerprint: &Fingerprint) -> Option<Arc<CompletionResult>> {
        let live = match self.cache.get(fingerprint).await {
            Some(entry) if !entry.is_expired(Instant::now(), self.ttl) => Some(entry),
            Some(_) => {
                self.cache.invalidate(fingerprint).await;
                None
            }
            None => None,
        };
        match live {
            Some(entry) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(Arc::clone(&entry.result))
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert or overwrite the result for `fingerprint`.
    pub async fn insert(&self, fingerprint: Fingerprint, result: Arc<CompletionResult>) {
        let entry = Arc::new(CacheEntry::new(fingerprint.clone(), result));
        self.cache.insert(fingerprint, entry).await;
    }

    /// Return the cached result for `fingerprint`, computing it with
    /// `compute` on a miss.
    ///
    /// The boolean is `true` when this call ran the computation, `false`
    /// when the result came from the cache or from a concurrent caller's
    /// computation.
    pub async fn get_or_compute<F>(
        &self,
        fingerprint: &Fingerprint,
        compute: F,
    ) -> (Arc<CompletionResult>, bool)
    where
        F: Future<Output = Arc<CompletionResult>>,
    {
        let key = fingerprint.clone();
        let entry = self
            .cache
            .entry(fingerprint.clone())
            .or_insert_with(async move { Arc::new(CacheEntry::new(key, compute.await)) })
            .await;

        let fresh = entry.is_fresh();
        if fresh {
            metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        } else {
            metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
        }
        (Arc::clone(&entry.into_value().result), fresh)
    }

    /// Drop the entry for `fingerprint`, if any.
    pub async fn invalidate(&self, fingerprint: &Fingerprint) {
        self.cache.invalidate(fingerprint).await;
    }

    /// Whether an entry for `fingerprint` is present. Does not count as an
    /// access for eviction purposes.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.cache.contains_key(fingerprint)
    }

    /// Number of live entries after pending evictions are applied.
    pub async fn len(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}
