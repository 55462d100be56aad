//! Builder for configuring engine instances

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::CompletionEngine;
use crate::cache::{CacheConfig, MAX_CACHE_TTL, ResponseCache};
use crate::config::{Config, Secrets};
use crate::providers::{
    CompletionProvider, DEFAULT_PROVIDER_TIMEOUT, LocalModel, LocalModelProvider, ProviderChain,
    RemoteLlmProvider, RetryConfig, RuleBasedProvider,
};
use crate::types::{Language, RequestLimits};
use crate::{MuninnError, Result};

/// Main entry point for creating engine instances.
pub struct Muninn;

impl Muninn {
    /// Create a new builder for configuring the engine.
    pub fn builder() -> MuninnBuilder {
        MuninnBuilder::new()
    }

    /// Builder pre-populated from configuration and secrets.
    ///
    /// The remote provider is enabled when an API key is available. Local
    /// models that fail to load are logged and skipped; the language then
    /// falls through to the remaining providers.
    pub fn from_config(config: &Config, secrets: &Secrets) -> Result<MuninnBuilder> {
        let mut builder = Self::builder()
            .cache(config.cache.to_cache_config())
            .limits(config.limits)
            .provider_timeout(Duration::from_secs(config.providers.timeout_secs))
            .retry(config.providers.retry.to_retry_config());

        if let Some(key) = secrets.remote_api_key() {
            let remote = &config.providers.remote;
            builder = builder
                .remote_llm(key)
                .remote_model(&remote.model)
                .remote_fan_out(remote.fan_out);
            if let Some(url) = &remote.base_url {
                builder = builder.remote_base_url(url);
            }
            info!(model = %remote.model, "remote LLM provider configured");
        }

        for (language, source) in config.providers.local_models()? {
            match source.load() {
                Ok(model) => {
                    info!(%language, "loaded local model");
                    builder = builder.local_model(language, model);
                }
                Err(e) => warn!(%language, error = %e, "failed to load local model"),
            }
        }

        Ok(builder)
    }
}

/// Builder for configuring engine instances.
pub struct MuninnBuilder {
    remote_key: Option<String>,
    remote_base_url: Option<String>,
    remote_model: Option<String>,
    remote_fan_out: Option<u32>,
    local: LocalModelProvider,
    extra: Vec<Arc<dyn CompletionProvider>>,
    fallback: Option<Arc<dyn CompletionProvider>>,
    cache: CacheConfig,
    limits: RequestLimits,
    provider_timeout: Duration,
    retry: RetryConfig,
}

impl MuninnBuilder {
    pub fn new() -> Self {
        Self {
            remote_key: None,
            remote_base_url: None,
            remote_model: None,
            remote_fan_out: None,
            local: LocalModelProvider::new(),
            extra: Vec::new(),
            fallback: None,
            cache: CacheConfig::default(),
            limits: RequestLimits::default(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    /// Enable the remote LLM provider with an API key.
    pub fn remote_llm(mut self, api_key: impl Into<String>) -> Self {
        self.remote_key = Some(api_key.into());
        self
    }

    /// Point the remote provider at a compatible endpoint.
    pub fn remote_base_url(mut self, url: impl Into<String>) -> Self {
        self.remote_base_url = Some(url.into());
        self
    }

    /// Chat model requested from the remote provider.
    pub fn remote_model(mut self, model: impl Into<String>) -> Self {
        self.remote_model = Some(model.into());
        self
    }

    /// Choices requested per remote call.
    pub fn remote_fan_out(mut self, n: u32) -> Self {
        self.remote_fan_out = Some(n);
        self
    }

    /// Register a local model for `language`.
    pub fn local_model(mut self, language: Language, model: LocalModel) -> Self {
        self.local.insert(language, model);
        self
    }

    /// Append a custom primary provider, run after the built-in ones.
    pub fn provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.extra.push(provider);
        self
    }

    /// Replace the rule-based terminal fallback.
    pub fn fallback(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.fallback = Some(provider);
        self
    }

    /// Configure the response cache. `max_entries(0)` disables it.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = config;
        self
    }

    /// Disable response caching.
    pub fn no_cache(self) -> Self {
        self.cache(CacheConfig::new().max_entries(0))
    }

    /// Request limits enforced by [`CompletionEngine::request`].
    pub fn limits(mut self, limits: RequestLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Upper bound on each provider attempt.
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Retry policy for the remote provider.
    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Build the engine.
    pub fn build(self) -> Result<CompletionEngine> {
        if self.provider_timeout.is_zero() {
            return Err(MuninnError::Configuration(
                "provider timeout must be positive".into(),
            ));
        }
        if self.cache.is_enabled() && self.cache.ttl.is_zero() {
            return Err(MuninnError::Configuration(
                "cache ttl must be positive when caching is enabled".into(),
            ));
        }
        if self.cache.is_enabled() && self.cache.ttl > MAX_CACHE_TTL {
            return Err(MuninnError::Configuration(format!(
                "cache ttl must not exceed {MAX_CACHE_TTL:?}"
            )));
        }
        if self.limits.max_code_length == 0 || self.limits.max_tokens == 0 {
            return Err(MuninnError::Configuration(
                "request limits must be positive".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(MuninnError::Configuration(
                "retry max_attempts must be at least 1".into(),
            ));
        }

        let fallback = self
            .fallback
            .unwrap_or_else(|| Arc::new(RuleBasedProvider::new()));
        let mut chain = ProviderChain::new(fallback).timeout(self.provider_timeout);

        if let Some(key) = self.remote_key {
            let mut remote = match self.remote_base_url {
                Some(url) => RemoteLlmProvider::with_base_url(key, url),
                None => RemoteLlmProvider::new(key),
            }
            .retry(self.retry);
            if let Some(model) = self.remote_model {
                remote = remote.model(model);
            }
            if let Some(n) = self.remote_fan_out {
                remote = remote.fan_out(n);
            }
            chain = chain.push(Arc::new(remote));
        }

        let models_loaded = self.local.languages();
        if !self.local.is_empty() {
            chain = chain.push(Arc::new(self.local));
        }

        for provider in self.extra {
            chain = chain.push(provider);
        }

        let cache = self
            .cache
            .is_enabled()
            .then(|| ResponseCache::new(&self.cache));

        Ok(CompletionEngine {
            chain,
            cache,
            limits: self.limits,
            models_loaded,
        })
    }
}

impl Default for MuninnBuilder {
    fn default() -> Self {
        Self::new()
    }
}
