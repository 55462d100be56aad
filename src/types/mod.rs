//! Public types for the Muninn API.

mod language;
mod metrics;
mod request;
mod result;

pub use language::Language;
pub use metrics::EngineMetrics;
pub use request::{CompletionRequest, CompletionRequestBuilder, RequestLimits};
pub use result::{CompletionCandidate, CompletionResult, ProviderKind};
