//! Engine observability snapshot.

use serde::Serialize;

use super::{Language, ProviderKind};

/// Point-in-time view of the engine, for health and metrics endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineMetrics {
    /// Live cache entries (0 when caching is disabled).
    pub cache_size: u64,
    /// Providers the engine can invoke, in chain order.
    pub providers_available: Vec<ProviderKind>,
    /// Languages with a loaded local model.
    pub models_loaded: Vec<Language>,
    /// Languages the engine accepts.
    pub supported_languages: Vec<Language>,
}
