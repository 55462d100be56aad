//! Sliding-window rate limiting.
//!
//! Each key keeps the timestamps of its admitted requests within the
//! trailing window. A check prunes timestamps that have aged out, then
//! admits (and records) the request only if fewer than `limit` remain.
//! Rejected requests are not recorded, so a client hammering a closed
//! window does not extend it.
//!
//! Time is read from [`tokio::time::Instant`] so tests can pause and
//! advance the clock.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

/// Checks between automatic sweeps of idle keys.
const SWEEP_INTERVAL: u64 = 1024;

/// Requests allowed per window for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RateLimitPolicy {
    pub requests: usize,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub fn new(requests: usize, window_secs: u64) -> Self {
        Self {
            requests,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitPolicy {
    /// 100 requests per minute.
    fn default() -> Self {
        Self::new(100, 60)
    }
}

/// Admitted-request timestamps for one key, oldest first.
#[derive(Debug)]
struct RateWindow {
    window: Duration,
    hits: VecDeque<Instant>,
}

impl RateWindow {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.hits.front() {
            if now.duration_since(oldest) < self.window {
                break;
            }
            self.hits.pop_front();
        }
    }
}

/// In-memory sliding-window limiter keyed by arbitrary strings.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: Mutex<HashMap<String, RateWindow>>,
    checks: AtomicU64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit a request for `key` if fewer than `limit` were admitted within
    /// the trailing `window`.
    pub fn allowed(&self, key: &str, limit: usize, window: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.lock();

        let entry = windows.entry(key.to_owned()).or_insert_with(|| RateWindow {
            window,
            hits: VecDeque::new(),
        });
        entry.window = window;
        entry.prune(now);
        let admitted = entry.hits.len() < limit;
        if admitted {
            entry.hits.push_back(now);
        }

        if self.checks.fetch_add(1, Ordering::Relaxed) % SWEEP_INTERVAL == SWEEP_INTERVAL - 1 {
            sweep_locked(&mut windows, now);
        }
        admitted
    }

    /// Drop keys with no timestamps left in their window.
    pub fn sweep(&self) {
        let now = Instant::now();
        sweep_locked(&mut self.lock(), now);
    }

    /// Number of keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RateWindow>> {
        // only timestamps live here, so a poisoned map is still usable
        self.windows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn sweep_locked(windows: &mut HashMap<String, RateWindow>, now: Instant) {
    windows.retain(|_, w| {
        w.prune(now);
        !w.hits.is_empty()
    });
}
