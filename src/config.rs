//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.muninn/config.toml` (user)
//! 3. `/etc/muninn/config.toml` (system)
//!
//! Every field has a default, so when no file exists the defaults apply.
//!
//! Secrets are loaded separately with mandatory permission checks:
//! 1. `~/.muninn/secrets.toml` (user, must be 0600)
//! 2. `/etc/muninn/secrets.toml` (system, must be 0600)
//!
//! Each secret falls back to an environment variable when the file does not
//! set it.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::access::RateLimitPolicy;
use crate::cache::{CacheConfig, MAX_CACHE_TTL};
use crate::providers::{LocalModel, RetryConfig};
use crate::providers::remote::{DEFAULT_FAN_OUT, DEFAULT_MODEL};
use crate::types::{Language, RequestLimits};
use crate::{MuninnError, Result};

/// Placeholder signing secret shipped in sample configs; refused at startup.
pub const PLACEHOLDER_SECRET: &str = "your-secret-key-change-in-production";

/// Minimum signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Environment fallback for the remote provider key.
pub const REMOTE_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment fallback for the signing secret.
pub const SECRET_KEY_ENV: &str = "MUNINN_SECRET_KEY";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub limits: RequestLimits,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub rate_limits: RateLimitsConfig,
}

/// Response cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Maximum entries; 0 disables caching (default: 1000).
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
    /// Entry lifetime in seconds (default: 3600).
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
        }
    }
}

impl CacheSection {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig::new()
            .max_entries(self.max_entries)
            .ttl(Duration::from_secs(self.ttl_secs))
    }
}

fn default_max_entries() -> u64 {
    1_000
}

fn default_ttl_secs() -> u64 {
    3_600
}

/// Provider configurations.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Per-attempt timeout in seconds (default: 30).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub retry: RetrySection,
    /// Local models keyed by language name.
    #[serde(default)]
    pub local: BTreeMap<String, LocalModelConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            remote: RemoteConfig::default(),
            retry: RetrySection::default(),
            local: BTreeMap::new(),
        }
    }
}

impl ProvidersConfig {
    /// Local model entries with their language names parsed.
    pub fn local_models(&self) -> Result<Vec<(Language, &LocalModelConfig)>> {
        self.local
            .iter()
            .map(|(name, model)| {
                let language = name.parse::<Language>().map_err(|_| {
                    MuninnError::Configuration(format!(
                        "unknown language in [providers.local.{name}]"
                    ))
                })?;
                Ok((language, model))
            })
            .collect()
    }
}

fn default_timeout() -> u64 {
    30
}

/// Remote retry policy, in milliseconds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Attempts including the first; 1 disables retry (default: 3).
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_attempts: defaults.max_attempts,
            initial_delay_ms: defaults.initial_delay.as_millis() as u64,
            max_delay_ms: defaults.max_delay.as_millis() as u64,
            jitter: defaults.jitter,
        }
    }
}

impl RetrySection {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig::new()
            .max_attempts(self.max_attempts)
            .initial_delay(Duration::from_millis(self.initial_delay_ms))
            .max_delay(Duration::from_millis(self.max_delay_ms))
            .jitter(self.jitter)
    }
}

/// Remote LLM settings. The API key comes from [`Secrets`].
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Chat model (default: gpt-4).
    #[serde(default = "default_model")]
    pub model: String,
    /// OpenAI-compatible endpoint (default: the OpenAI API).
    #[serde(default)]
    pub base_url: Option<String>,
    /// Choices requested per call (default: 3).
    #[serde(default = "default_fan_out")]
    pub fan_out: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: None,
            fan_out: default_fan_out(),
        }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_fan_out() -> u32 {
    DEFAULT_FAN_OUT
}

/// One local model: either a HuggingFace repo or explicit file paths.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalModelConfig {
    #[serde(default)]
    pub repo_id: Option<String>,
    #[serde(default)]
    pub model_path: Option<PathBuf>,
    #[serde(default)]
    pub tokenizer_path: Option<PathBuf>,
    /// Device to use: "cpu" or "cuda" (default: "cpu").
    #[serde(default = "default_device")]
    pub device: String,
}

fn default_device() -> String {
    "cpu".to_string()
}

impl LocalModelConfig {
    /// Load the model this entry describes.
    #[cfg(feature = "local-inference")]
    pub fn load(&self) -> Result<LocalModel> {
        use crate::providers::{Device, ModelSource};

        let source = match (&self.repo_id, &self.model_path, &self.tokenizer_path) {
            (_, Some(model_path), Some(tokenizer_path)) => ModelSource::Files {
                model_path: model_path.clone(),
                tokenizer_path: tokenizer_path.clone(),
            },
            (Some(repo_id), None, None) => ModelSource::Hub {
                repo_id: repo_id.clone(),
            },
            _ => {
                return Err(MuninnError::Configuration(
                    "local model needs repo_id, or both model_path and tokenizer_path".into(),
                ));
            }
        };
        let device = match self.device.as_str() {
            "cpu" => Device::Cpu,
            #[cfg(feature = "cuda")]
            "cuda" => Device::Cuda { device_id: 0 },
            other => {
                return Err(MuninnError::Configuration(format!(
                    "unsupported device: {other}"
                )));
            }
        };
        LocalModel::load(&source, device)
    }

    #[cfg(not(feature = "local-inference"))]
    pub fn load(&self) -> Result<LocalModel> {
        Err(MuninnError::Configuration(
            "local models require the local-inference feature".into(),
        ))
    }
}

/// Token settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Default access-token lifetime in minutes (default: 30).
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_mins: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_lifetime_mins: default_token_lifetime(),
        }
    }
}

impl AuthConfig {
    pub fn token_lifetime(&self) -> Duration {
        Duration::from_secs(self.token_lifetime_mins.saturating_mul(60))
    }
}

fn default_token_lifetime() -> u64 {
    30
}

/// Rate-limit thresholds.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitsConfig {
    /// Policy for operations without an override (default: 100 per 60s).
    #[serde(default = "RateLimitPolicy::default")]
    pub default: RateLimitPolicy,
    /// Per-operation overrides (default: `complete` = 50 per 60s).
    #[serde(default = "default_operations")]
    pub operations: HashMap<String, RateLimitPolicy>,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self {
            default: RateLimitPolicy::default(),
            operations: default_operations(),
        }
    }
}

fn default_operations() -> HashMap<String, RateLimitPolicy> {
    HashMap::from([("complete".to_string(), RateLimitPolicy::new(50, 60))])
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided; must exist)
    /// 2. `~/.muninn/config.toml`
    /// 3. `/etc/muninn/config.toml`
    ///
    /// Returns the defaults when no file is found in 2 or 3.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot produce a working engine.
    pub fn validate(&self) -> Result<()> {
        self.providers.local_models()?;
        if self.providers.timeout_secs == 0 {
            return Err(MuninnError::Configuration(
                "providers.timeout_secs must be positive".into(),
            ));
        }
        if self.providers.retry.max_attempts == 0 {
            return Err(MuninnError::Configuration(
                "providers.retry.max_attempts must be at least 1".into(),
            ));
        }
        if self.cache.max_entries > 0 && self.cache.ttl_secs == 0 {
            return Err(MuninnError::Configuration(
                "cache.ttl_secs must be positive when caching is enabled".into(),
            ));
        }
        if self.cache.max_entries > 0 && self.cache.ttl_secs > MAX_CACHE_TTL.as_secs() {
            return Err(MuninnError::Configuration(format!(
                "cache.ttl_secs must not exceed {}",
                MAX_CACHE_TTL.as_secs()
            )));
        }
        let policies = std::iter::once(("default", &self.rate_limits.default)).chain(
            self.rate_limits
                .operations
                .iter()
                .map(|(name, policy)| (name.as_str(), policy)),
        );
        for (name, policy) in policies {
            if policy.requests == 0 || policy.window_secs == 0 {
                return Err(MuninnError::Configuration(format!(
                    "rate limit '{name}' must allow at least one request per non-empty window"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(MuninnError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".muninn").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/muninn/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}

/// Secrets (API key and signing secret).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Secrets {
    #[serde(default)]
    pub remote: Option<ApiKeySecret>,
    #[serde(default)]
    pub auth: Option<SigningSecret>,
}

/// A single API key secret.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiKeySecret {
    pub api_key: String,
}

/// HMAC/JWT signing secret.
#[derive(Debug, Clone, Deserialize)]
pub struct SigningSecret {
    pub secret_key: String,
}

impl Secrets {
    /// Load secrets from the standard locations with permission checks.
    ///
    /// Resolution order:
    /// 1. `~/.muninn/secrets.toml` (if exists, must be 0600)
    /// 2. `/etc/muninn/secrets.toml` (if exists, must be 0600)
    ///
    /// Returns empty secrets if no file exists (environment variables may
    /// still supply them).
    pub fn load() -> Result<Self> {
        if let Some(home) = dirs::home_dir() {
            let user_secrets = home.join(".muninn").join("secrets.toml");
            if user_secrets.exists() {
                return Self::from_file(&user_secrets);
            }
        }

        let system_secrets = PathBuf::from("/etc/muninn/secrets.toml");
        if system_secrets.exists() {
            return Self::from_file(&system_secrets);
        }

        Ok(Secrets::default())
    }

    /// Load a secrets file, refusing group- or world-readable files.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::check_permissions(path)?;
        let content = fs::read_to_string(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to read secrets file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MuninnError::Configuration(format!("Failed to parse secrets file {path:?}: {e}"))
        })
    }

    /// Check that the secrets file has secure permissions (0600 or 0400).
    #[cfg(unix)]
    fn check_permissions(path: &Path) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let metadata = fs::metadata(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to stat secrets file {path:?}: {e}"))
        })?;

        let mode = metadata.permissions().mode();
        // Reject if group or other bits are set
        if mode & 0o077 != 0 {
            return Err(MuninnError::Configuration(format!(
                "Secrets file {path:?} has insecure permissions {:o}. Must be 0600 or 0400.",
                mode & 0o777
            )));
        }

        Ok(())
    }

    #[cfg(not(unix))]
    fn check_permissions(_path: &Path) -> Result<()> {
        Ok(())
    }

    /// Remote provider key, falling back to `OPENAI_API_KEY`.
    pub fn remote_api_key(&self) -> Option<String> {
        self.remote
            .as_ref()
            .map(|s| s.api_key.clone())
            .or_else(|| std::env::var(REMOTE_API_KEY_ENV).ok())
            .filter(|key| !key.is_empty())
    }

    /// Validated signing secret, falling back to `MUNINN_SECRET_KEY`.
    ///
    /// Missing, placeholder and short secrets are configuration errors.
    pub fn signing_secret(&self) -> Result<String> {
        let secret = self
            .auth
            .as_ref()
            .map(|s| s.secret_key.clone())
            .or_else(|| std::env::var(SECRET_KEY_ENV).ok())
            .ok_or_else(|| {
                MuninnError::Configuration(format!(
                    "no signing secret: set [auth] secret_key in secrets.toml or {SECRET_KEY_ENV}"
                ))
            })?;
        validate_secret(&secret)?;
        Ok(secret)
    }
}

/// Refuse the placeholder secret and secrets under [`MIN_SECRET_LEN`] bytes.
pub fn validate_secret(secret: &str) -> Result<()> {
    if secret == PLACEHOLDER_SECRET {
        return Err(MuninnError::Configuration(
            "signing secret is the placeholder value; change it before deploying".into(),
        ));
    }
    if secret.len() < MIN_SECRET_LEN {
        return Err(MuninnError::Configuration(format!(
            "signing secret must be at least {MIN_SECRET_LEN} bytes"
        )));
    }
    Ok(())
}
