//! Muninn error types

use std::time::Duration;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Request errors (rejected before reaching the engine)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Access-control errors (terminal for the request, never retried)
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("rate limit exceeded for '{operation}': maximum {limit} requests per {window:?}")]
    RateLimitExceeded {
        operation: String,
        limit: usize,
        window: Duration,
    },

    // Provider/network errors. These stay inside the provider chain: an
    // attempt that fails degrades to zero candidates.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("upstream rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("upstream authentication failed")]
    AuthenticationFailed,

    #[error("upstream call timed out after {0:?}")]
    Timeout(Duration),

    // Local inference errors
    #[error("inference error: {0}")]
    Inference(String),

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MuninnError {
    /// Whether a retry of the same provider call may succeed.
    ///
    /// Connection failures, timeouts, upstream rate limiting and 5xx API
    /// responses are transient. Everything else is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Provider-supplied retry delay, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Credential verification failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Token signature or structure did not verify.
    #[error("invalid token signature")]
    InvalidSignature,

    /// Token or API key is past its lifetime.
    #[error("credential expired")]
    Expired,

    /// API key is not `identity.timestamp.signature`.
    #[error("malformed API key")]
    BadFormat,

    /// API key signature does not match.
    #[error("API key signature mismatch")]
    BadSignature,

    /// Verified claims hold none of the required roles.
    #[error("insufficient permissions")]
    InsufficientRole,
}

impl AuthError {
    /// Short label for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid_signature",
            Self::Expired => "expired",
            Self::BadFormat => "bad_format",
            Self::BadSignature => "bad_signature",
            Self::InsufficientRole => "insufficient_role",
        }
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
