//! Muninn - code-completion gateway
//!
//! This crate fans a completion request out to a chain of suggestion
//! providers (a remote LLM API, per-language local models, static rule
//! tables), merges their candidates into one ranked result, and caches the
//! result under a fingerprint of the request. An [`AccessControl`] layer
//! issues and verifies tokens and API keys and rate-limits callers before
//! they reach the engine.
//!
//! # Completion Example
//!
//! ```rust,no_run
//! use muninn::{CompletionRequest, Language, Muninn};
//!
//! #[tokio::main]
//! async fn main() -> muninn::Result<()> {
//!     let engine = Muninn::builder()
//!         .remote_llm("sk-your-key")
//!         .build()?;
//!
//!     let request = engine.request(
//!         CompletionRequest::builder("def fib(n):\n    ", Language::Python).max_tokens(50),
//!     )?;
//!     let result = engine.complete(&request).await;
//!
//!     for candidate in &result.candidates {
//!         println!("{:.1} {}", candidate.confidence, candidate.text);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Access Control Example
//!
//! ```rust
//! use muninn::AccessControl;
//!
//! # fn main() -> muninn::Result<()> {
//! let access = AccessControl::new("a-sufficiently-long-secret")?;
//! let key = access.issue_api_key("ci-runner")?;
//! assert_eq!(access.verify_api_key(&key)?, "ci-runner");
//! access.check_rate_limit("ci-runner", "complete")?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod merge;
pub mod providers;
pub mod telemetry;
pub mod tokenizer;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use access::{AccessControl, Claims, RateLimitPolicy, RateLimiter};
pub use cache::{CacheConfig, ResponseCache};
pub use config::{Config, Secrets};
pub use engine::{CompletionEngine, Muninn, MuninnBuilder};
pub use error::{AuthError, MuninnError, Result};
pub use fingerprint::Fingerprint;
pub use providers::{
    Attempt, Cancellation, CompletionProvider, LocalModel, ProviderChain, RemoteLlmProvider,
    RetryConfig, RuleBasedProvider, SamplingParams, TextGenerator,
};
pub use tokenizer::TokenizerProvider;

#[cfg(feature = "local-inference")]
pub use tokenizer::HfTokenizer;

// Re-export all types
pub use types::{
    CompletionCandidate, CompletionRequest, CompletionRequestBuilder, CompletionResult,
    EngineMetrics, Language, ProviderKind, RequestLimits,
};
