//! Completion providers and the chain that runs them.
//!
//! - [`RemoteLlmProvider`]: OpenAI-compatible chat completions, confidence 0.9
//! - [`LocalModelProvider`]: per-language in-process models, confidence 0.7
//! - [`RuleBasedProvider`]: static pattern tables, confidence 0.5, terminal fallback
//!
//! [`ProviderChain`] invokes them in that order and records per-attempt
//! metrics.

pub mod chain;
pub mod local;
#[cfg(feature = "local-inference")]
pub mod onnx_lm;
pub mod remote;
pub mod retry;
pub mod rules;
pub mod traits;

pub use chain::{ChainOutcome, DEFAULT_PROVIDER_TIMEOUT, ProviderChain};
pub use local::{Cancellation, LocalModel, LocalModelProvider, SamplingParams, TextGenerator};
#[cfg(feature = "local-inference")]
pub use onnx_lm::{Device, ModelSource, OnnxCausalLm};
pub use remote::RemoteLlmProvider;
pub use retry::RetryConfig;
pub use rules::RuleBasedProvider;
pub use traits::{Attempt, CompletionProvider};
