//! Ordered provider chain with terminal fallback.
//!
//! The chain runs its primary providers in registration order (remote model
//! first, then the local model), each bounded by the chain timeout. The
//! fallback provider runs only when no primary produced a candidate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use super::traits::{Attempt, CompletionProvider};
use crate::telemetry;
use crate::types::{CompletionCandidate, CompletionRequest, ProviderKind};

/// Default per-attempt timeout.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the chain observed for one request, in invocation order.
#[derive(Debug, Default)]
pub struct ChainOutcome {
    pub attempts: Vec<(ProviderKind, Attempt)>,
}

impl ChainOutcome {
    /// All candidates in invocation order, intra-provider order preserved.
    pub fn candidates(&self) -> impl Iterator<Item = &CompletionCandidate> {
        self.attempts.iter().flat_map(|(_, a)| a.candidates())
    }

    pub fn has_candidates(&self) -> bool {
        self.candidates().next().is_some()
    }

    /// Whether any attempt failed or timed out.
    pub fn is_degraded(&self) -> bool {
        self.attempts.iter().any(|(_, a)| a.is_degraded())
    }
}

/// Primary providers plus an always-available fallback.
pub struct ProviderChain {
    primary: Vec<Arc<dyn CompletionProvider>>,
    fallback: Arc<dyn CompletionProvider>,
    timeout: Duration,
}

impl ProviderChain {
    /// Chain with no primaries; every request goes to `fallback`.
    pub fn new(fallback: Arc<dyn CompletionProvider>) -> Self {
        Self {
            primary: Vec::new(),
            fallback,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    /// Append a primary provider. Primaries run in the order added.
    pub fn push(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.primary.push(provider);
        self
    }

    /// Bound each provider attempt to `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Provider kinds in invocation order, fallback last.
    pub fn kinds(&self) -> Vec<ProviderKind> {
        self.primary
            .iter()
            .chain(std::iter::once(&self.fallback))
            .map(|p| p.kind())
            .collect()
    }

    /// Run the chain for `request`.
    #[instrument(skip_all, fields(language = %request.language()))]
    pub async fn run(&self, request: &CompletionRequest) -> ChainOutcome {
        let mut outcome = ChainOutcome::default();
        for provider in &self.primary {
            let attempt = self.attempt(provider.as_ref(), request).await;
            outcome.attempts.push((provider.kind(), attempt));
        }

        if outcome.has_candidates() {
            debug!("primary providers produced candidates, skipping fallback");
        } else {
            let attempt = self.attempt(self.fallback.as_ref(), request).await;
            outcome.attempts.push((self.fallback.kind(), attempt));
        }
        outcome
    }

    async fn attempt(&self, provider: &dyn CompletionProvider, request: &CompletionRequest) -> Attempt {
        if !provider.supports(request.language()) {
            return Attempt::Skipped;
        }

        let kind = provider.kind();
        let start = Instant::now();
        let attempt = match tokio::time::timeout(self.timeout, provider.attempt(request)).await {
            Ok(attempt) => attempt,
            Err(_) => {
                warn!(provider = %kind, timeout_ms = self.timeout.as_millis() as u64, "provider attempt timed out");
                Attempt::TimedOut(self.timeout)
            }
        };
        record_attempt(kind, &attempt, start);
        attempt
    }
}

fn record_attempt(kind: ProviderKind, attempt: &Attempt, start: Instant) {
    metrics::counter!(telemetry::PROVIDER_ATTEMPTS_TOTAL,
        "provider" => kind.as_str(),
        "status" => attempt.status(),
    )
    .increment(1);
    metrics::histogram!(telemetry::PROVIDER_DURATION_SECONDS, "provider" => kind.as_str())
        .record(start.elapsed().as_secs_f64());
}
