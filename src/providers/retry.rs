//! Retry configuration and delay calculation.
//!
//! Provides [`RetryConfig`] for controlling retry behaviour and the shared
//! `with_retry()` helper that network-backed providers wrap their calls in.

use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::telemetry;
use crate::{MuninnError, Result};

/// Configuration for retry behaviour on transient errors.
///
/// Uses exponential backoff with optional jitter:
///
/// ```rust
/// # use muninn::RetryConfig;
/// # use std::time::Duration;
/// let config = RetryConfig::new()
///     .max_attempts(5)
///     .initial_delay(Duration::from_millis(200))
///     .jitter(true);
/// ```
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    /// 1 = no retry. Default: 3.
    pub max_attempts: u32,
    /// Base delay before the first retry. Default: 500ms.
    pub initial_delay: Duration,
    /// Maximum delay between retries (caps exponential growth). Default: 30s.
    pub max_delay: Duration,
    /// Whether to add random jitter to delays. Default: true.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a config that disables retries (single attempt).
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Set maximum attempts (including the initial request).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Set the base delay before the first retry.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Enable or disable jitter.
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Calculate the delay for a given attempt number (0-indexed).
    ///
    /// Uses exponential backoff: `initial_delay * 2^attempt`, capped at `max_delay`.
    /// Does NOT include jitter; see [`effective_delay()`](Self::effective_delay)
    /// for the full calculation.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }

    /// Calculate the effective delay, respecting provider `retry_after` hints.
    ///
    /// A `retry_after` duration (from a `RateLimited` error) takes precedence
    /// over the calculated backoff and is never jittered. Otherwise, with
    /// jitter enabled, the backoff is scaled by a random factor in `[0.5, 1.0]`.
    pub fn effective_delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        if let Some(delay) = retry_after {
            return delay;
        }
        let delay = self.delay_for_attempt(attempt);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            delay
        }
    }
}

/// Execute an async operation with retry logic.
///
/// Retries on transient errors (as classified by [`MuninnError::is_transient()`])
/// up to `config.max_attempts`, using exponential backoff and respecting
/// `retry_after` hints from `RateLimited` errors.
///
/// Permanent errors are returned immediately without retry.
pub(crate) async fn with_retry<F, Fut, T>(config: &RetryConfig, provider: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    metrics::counter!(telemetry::RETRIES_TOTAL, "provider" => provider.to_owned())
                        .increment(1);
                    let delay = config.effective_delay(attempt, e.retry_after());
                    warn!(
                        provider,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e), // permanent error, no retry
        }
    }
    Err(last_err.unwrap_or(MuninnError::NoProvider))
}
