//! The completion engine: fingerprint, cache, provider chain, merge.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument};

use crate::cache::ResponseCache;
use crate::fingerprint::Fingerprint;
use crate::merge::merge;
use crate::providers::ProviderChain;
use crate::telemetry;
use crate::types::{
    CompletionRequest, CompletionRequestBuilder, CompletionResult, EngineMetrics, Language,
    RequestLimits,
};
use crate::Result;

/// Orchestrates one request/response cycle per [`complete`](Self::complete).
///
/// Construct with [`Muninn::builder()`](crate::Muninn::builder). The engine
/// is `Send + Sync`; share it behind an `Arc` across request handlers.
pub struct CompletionEngine {
    pub(super) chain: ProviderChain,
    pub(super) cache: Option<ResponseCache>,
    pub(super) limits: RequestLimits,
    pub(super) models_loaded: Vec<Language>,
}

impl CompletionEngine {
    /// Limits requests must satisfy before reaching the engine.
    pub fn limits(&self) -> &RequestLimits {
        &self.limits
    }

    /// Validate `builder` against this engine's limits.
    pub fn request(&self, builder: CompletionRequestBuilder) -> Result<CompletionRequest> {
        builder.build(&self.limits)
    }

    /// Produce ranked suggestions for `request`.
    ///
    /// Never fails: provider errors and timeouts only reduce the candidate
    /// set. A cache hit returns the stored result itself, so repeated
    /// requests observe identical values. Concurrent misses for one
    /// fingerprint share a single provider chain run. Results degraded by a
    /// provider failure are returned but not retained. Log lines for the
    /// call carry the request's `user_id` for auditing.
    #[instrument(skip_all, fields(language = %request.language(), user_id = request.user_id()))]
    pub async fn complete(&self, request: &CompletionRequest) -> Arc<CompletionResult> {
        let result = match &self.cache {
            Some(cache) => {
                let fingerprint = Fingerprint::of(request);
                let mut degraded = false;
                let (result, fresh) = cache
                    .get_or_compute(&fingerprint, async {
                        let (result, was_degraded) = self.compute(request).await;
                        degraded = was_degraded;
                        result
                    })
                    .await;

                if !fresh {
                    debug!(%fingerprint, "returning cached completion result");
                } else if degraded {
                    debug!(%fingerprint, "not retaining degraded result");
                    cache.invalidate(&fingerprint).await;
                }
                result
            }
            None => self.compute(request).await.0,
        };

        metrics::counter!(telemetry::COMPLETIONS_TOTAL, "model_used" => result.model_used.as_str())
            .increment(1);
        result
    }

    /// Run the chain and merge. The flag reports a degraded outcome.
    async fn compute(&self, request: &CompletionRequest) -> (Arc<CompletionResult>, bool) {
        let start = Instant::now();
        let outcome = self.chain.run(request).await;
        let result = merge(request, &outcome, start.elapsed());

        metrics::histogram!(telemetry::COMPLETION_DURATION_SECONDS)
            .record(result.processing_time.as_secs_f64());
        info!(
            language = %request.language(),
            suggestions_count = outcome.candidates().count(),
            processing_time = result.processing_time.as_secs_f64(),
            model_used = %result.model_used,
            "code completion completed"
        );
        (Arc::new(result), outcome.is_degraded())
    }

    /// Snapshot for observability endpoints.
    pub async fn get_metrics(&self) -> EngineMetrics {
        let cache_size = match &self.cache {
            Some(cache) => cache.len().await,
            None => 0,
        };
        EngineMetrics {
            cache_size,
            providers_available: self.chain.kinds(),
            models_loaded: self.models_loaded.clone(),
            supported_languages: Language::all().to_vec(),
        }
    }

    /// Drop every cached result.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}
