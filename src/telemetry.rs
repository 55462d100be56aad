//! Telemetry metric name constants.
//!
//! Centralised metric names for muninn operations. Consumers install
//! their own `metrics` recorder (e.g. prometheus, statsd); without a
//! recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `muninn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `provider`: provider name ("remote-llm", "local-model", "rule-based")
//! - `status`: attempt outcome: "ok", "empty", "error" or "timeout"
//! - `operation`: rate-limited operation (e.g. "complete")

/// Total completions served, cached or computed.
///
/// Labels: `model_used`.
pub const COMPLETIONS_TOTAL: &str = "muninn_completions_total";

/// Wall-clock duration of a computed (uncached) completion, in seconds.
pub const COMPLETION_DURATION_SECONDS: &str = "muninn_completion_duration_seconds";

/// Total response cache hits.
pub const CACHE_HITS_TOTAL: &str = "muninn_cache_hits_total";

/// Total response cache misses.
pub const CACHE_MISSES_TOTAL: &str = "muninn_cache_misses_total";

/// Total provider attempts.
///
/// Labels: `provider`, `status` ("ok" | "empty" | "error" | "timeout").
pub const PROVIDER_ATTEMPTS_TOTAL: &str = "muninn_provider_attempts_total";

/// Provider attempt duration in seconds.
///
/// Labels: `provider`.
pub const PROVIDER_DURATION_SECONDS: &str = "muninn_provider_duration_seconds";

/// Total retry attempts (not counting the initial request).
///
/// Labels: `provider`.
pub const RETRIES_TOTAL: &str = "muninn_retries_total";

/// Total requests rejected by the rate limiter.
///
/// Labels: `operation`.
pub const RATE_LIMIT_REJECTIONS_TOTAL: &str = "muninn_rate_limit_rejections_total";

/// Total failed credential verifications.
///
/// Labels: `kind` (the `AuthError` label).
pub const AUTH_FAILURES_TOTAL: &str = "muninn_auth_failures_total";
