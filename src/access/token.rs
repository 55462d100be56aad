//! Signed, time-limited access tokens (HS256 JWT).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::{MuninnError, Result};

/// Token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identity.
    pub sub: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    /// Issued at, seconds since the Unix epoch.
    pub iat: u64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

impl Claims {
    /// Claims for `subject` issued at `issued_at` and valid for `lifetime`.
    pub fn new(subject: impl Into<String>, roles: Vec<String>, issued_at: u64, lifetime: Duration) -> Self {
        Self {
            sub: subject.into(),
            roles,
            iat: issued_at,
            exp: issued_at.saturating_add(lifetime.as_secs()),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Succeed if the claims hold at least one of `roles`.
    pub fn require_any_role(&self, roles: &[&str]) -> std::result::Result<(), AuthError> {
        if roles.iter().any(|role| self.has_role(role)) {
            Ok(())
        } else {
            Err(AuthError::InsufficientRole)
        }
    }
}

/// HS256 signer and verifier sharing one secret.
pub(crate) struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub(crate) fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub(crate) fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| MuninnError::Configuration(format!("failed to sign token: {e}")))
    }

    pub(crate) fn verify(&self, token: &str) -> std::result::Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidSignature,
            })
    }
}

/// Seconds since the Unix epoch.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"unit-test-signing-secret";

    #[test]
    fn sign_then_verify_returns_claims() {
        let signer = TokenSigner::new(SECRET);
        let claims = Claims::new("alice", vec!["admin".into()], unix_now(), Duration::from_secs(60));
        let token = signer.sign(&claims).unwrap();
        assert_eq!(signer.verify(&token).unwrap(), claims);
    }

    #[test]
    fn past_expiry_is_expired() {
        let signer = TokenSigner::new(SECRET);
        let claims = Claims::new("alice", vec![], unix_now() - 120, Duration::from_secs(60));
        let token = signer.sign(&claims).unwrap();
        assert_eq!(signer.verify(&token), Err(AuthError::Expired));
    }

    #[test]
    fn other_secret_is_invalid_signature() {
        let claims = Claims::new("alice", vec![], unix_now(), Duration::from_secs(60));
        let token = TokenSigner::new(SECRET).sign(&claims).unwrap();
        let other = TokenSigner::new(b"a-different-signing-secret");
        assert_eq!(other.verify(&token), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn garbage_is_invalid_signature() {
        let signer = TokenSigner::new(SECRET);
        assert_eq!(signer.verify("not.a.jwt"), Err(AuthError::InvalidSignature));
    }

    #[test]
    fn role_checks() {
        let claims = Claims::new("bob", vec!["reader".into()], 0, Duration::ZERO);
        assert!(claims.require_any_role(&["writer", "reader"]).is_ok());
        assert_eq!(claims.require_any_role(&["admin"]), Err(AuthError::InsufficientRole));
    }
}
