//! Access control: tokens, API keys and rate limiting.
//!
//! [`AccessControl`] owns the signing secret and the rate-limit state.
//! Request-gating middleware calls its primitives before handing a request
//! to the [`CompletionEngine`](crate::CompletionEngine):
//!
//! ```rust
//! # use muninn::AccessControl;
//! # fn main() -> muninn::Result<()> {
//! let access = AccessControl::new("a-sufficiently-long-secret")?;
//! let token = access.issue_token("alice", vec!["user".into()], None)?;
//! let claims = access.verify_token(&token)?;
//! access.check_rate_limit(&claims.sub, "complete")?;
//! # Ok(())
//! # }
//! ```
//!
//! Authentication and rate-limit failures are terminal for the request and
//! surface as [`MuninnError::Auth`] and [`MuninnError::RateLimitExceeded`].

mod api_key;
mod rate_limit;
mod token;

pub use api_key::API_KEY_LIFETIME;
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use token::Claims;

use std::collections::HashMap;
use std::time::Duration;

use tracing::warn;

use crate::config::{AuthConfig, RateLimitsConfig, Secrets, validate_secret};
use crate::error::AuthError;
use crate::telemetry;
use crate::{MuninnError, Result};
use api_key::ApiKeySigner;
use token::{TokenSigner, unix_now};

/// Default access-token lifetime.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Token and API-key issuance/verification plus per-operation rate limits.
pub struct AccessControl {
    tokens: TokenSigner,
    api_keys: ApiKeySigner,
    token_lifetime: Duration,
    limiter: RateLimiter,
    default_policy: RateLimitPolicy,
    policies: HashMap<String, RateLimitPolicy>,
}

impl AccessControl {
    /// Create with `secret` and default lifetimes and limits.
    ///
    /// Rejects the placeholder secret and secrets shorter than 16 bytes.
    pub fn new(secret: impl AsRef<str>) -> Result<Self> {
        let secret = secret.as_ref();
        validate_secret(secret)?;
        let RateLimitsConfig {
            default,
            operations,
        } = RateLimitsConfig::default();
        Ok(Self {
            tokens: TokenSigner::new(secret.as_bytes()),
            api_keys: ApiKeySigner::new(secret.as_bytes()),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            limiter: RateLimiter::new(),
            default_policy: default,
            policies: operations,
        })
    }

    /// Build from configuration, reading the secret from `secrets`.
    pub fn from_config(
        auth: &AuthConfig,
        rate_limits: &RateLimitsConfig,
        secrets: &Secrets,
    ) -> Result<Self> {
        let mut access = Self::new(secrets.signing_secret()?)?
            .token_lifetime(auth.token_lifetime())
            .default_rate_limit(rate_limits.default);
        for (operation, policy) in &rate_limits.operations {
            access = access.rate_limit(operation.clone(), *policy);
        }
        Ok(access)
    }

    /// Default lifetime for tokens issued without an explicit one.
    pub fn token_lifetime(mut self, lifetime: Duration) -> Self {
        self.token_lifetime = lifetime;
        self
    }

    /// Policy for operations without an override.
    pub fn default_rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Override the policy for one operation.
    pub fn rate_limit(mut self, operation: impl Into<String>, policy: RateLimitPolicy) -> Self {
        self.policies.insert(operation.into(), policy);
        self
    }

    /// Policy applied to `operation`.
    pub fn policy(&self, operation: &str) -> RateLimitPolicy {
        self.policies
            .get(operation)
            .copied()
            .unwrap_or(self.default_policy)
    }

    // ========================================================================
    // Tokens
    // ========================================================================

    /// Issue a signed token for `subject`, valid for `lifetime` or the
    /// configured default.
    pub fn issue_token(
        &self,
        subject: &str,
        roles: Vec<String>,
        lifetime: Option<Duration>,
    ) -> Result<String> {
        if subject.is_empty() {
            return Err(MuninnError::InvalidRequest(
                "token subject must not be empty".into(),
            ));
        }
        let claims = Claims::new(
            subject,
            roles,
            unix_now(),
            lifetime.unwrap_or(self.token_lifetime),
        );
        self.tokens.sign(&claims)
    }

    /// Sign arbitrary claims. Verification still enforces `exp`.
    pub fn sign_claims(&self, claims: &Claims) -> Result<String> {
        self.tokens.sign(claims)
    }

    /// Verify a token's signature and expiry, returning its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        self.tokens.verify(token).map_err(record_auth_failure)
    }

    // ========================================================================
    // API keys
    // ========================================================================

    /// Issue an API key for `identity`, valid for 24 hours from now.
    pub fn issue_api_key(&self, identity: &str) -> Result<String> {
        self.issue_api_key_at(identity, unix_now())
    }

    /// Issue an API key as if at `timestamp` (Unix seconds).
    pub fn issue_api_key_at(&self, identity: &str, timestamp: u64) -> Result<String> {
        self.api_keys.issue(identity, timestamp)
    }

    /// Verify an API key, returning the identity it was issued to.
    pub fn verify_api_key(&self, key: &str) -> Result<String> {
        self.verify_api_key_at(key, unix_now())
    }

    /// Verify an API key as if at `now` (Unix seconds).
    pub fn verify_api_key_at(&self, key: &str, now: u64) -> Result<String> {
        self.api_keys.verify(key, now).map_err(record_auth_failure)
    }

    // ========================================================================
    // Rate limiting
    // ========================================================================

    /// Admit one `operation` call for `identity` or fail with
    /// [`MuninnError::RateLimitExceeded`].
    ///
    /// Budgets are independent per operation.
    pub fn check_rate_limit(&self, identity: &str, operation: &str) -> Result<()> {
        let policy = self.policy(operation);
        let key = rate_key(identity, operation);
        if self.limiter.allowed(&key, policy.requests, policy.window()) {
            return Ok(());
        }

        metrics::counter!(telemetry::RATE_LIMIT_REJECTIONS_TOTAL, "operation" => operation.to_owned())
            .increment(1);
        warn!(identity, operation, limit = policy.requests, "rate limit exceeded");
        Err(MuninnError::RateLimitExceeded {
            operation: operation.to_owned(),
            limit: policy.requests,
            window: policy.window(),
        })
    }

    /// The underlying limiter, for ad-hoc keys.
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

/// Limiter key for one identity and operation. The identity's byte length
/// leads so identities containing `:` cannot alias another pair.
fn rate_key(identity: &str, operation: &str) -> String {
    format!("{}:{identity}:{operation}", identity.len())
}

fn record_auth_failure(error: AuthError) -> MuninnError {
    metrics::counter!(telemetry::AUTH_FAILURES_TOTAL, "kind" => error.as_str()).increment(1);
    warn!(kind = error.as_str(), "credential verification failed");
    MuninnError::Auth(error)
}
