//! Self-verifying API keys.
//!
//! A key is `identity.timestamp.signature`, where the signature is the hex
//! HMAC-SHA256 of `identity:timestamp` under the service secret. Keys need
//! no storage: verification recomputes the MAC and checks the age. The
//! identity may itself contain dots; the key is split from the right.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AuthError;
use crate::{MuninnError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Lifetime of an API key from issuance.
pub const API_KEY_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

pub(crate) struct ApiKeySigner {
    secret: Vec<u8>,
}

impl ApiKeySigner {
    pub(crate) fn new(secret: &[u8]) -> Self {
        Self {
            secret: secret.to_vec(),
        }
    }

    fn mac(&self, identity: &str, timestamp: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(identity.as_bytes());
        mac.update(b":");
        mac.update(timestamp.as_bytes());
        mac
    }

    /// Key for `identity` issued at `timestamp` (Unix seconds).
    pub(crate) fn issue(&self, identity: &str, timestamp: u64) -> Result<String> {
        if identity.is_empty() {
            return Err(MuninnError::InvalidRequest(
                "API key identity must not be empty".into(),
            ));
        }
        let timestamp = timestamp.to_string();
        let signature = hex::encode(self.mac(identity, &timestamp).finalize().into_bytes());
        Ok(format!("{identity}.{timestamp}.{signature}"))
    }

    /// Verify `key` at `now` (Unix seconds), returning its identity.
    ///
    /// The signature is checked in constant time before the age, so an
    /// expired key is only reported as expired if it is genuine.
    pub(crate) fn verify(&self, key: &str, now: u64) -> std::result::Result<String, AuthError> {
        let mut parts = key.rsplitn(3, '.');
        let (Some(signature), Some(timestamp), Some(identity)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::BadFormat);
        };
        if identity.is_empty() {
            return Err(AuthError::BadFormat);
        }
        let issued_at: u64 = timestamp.parse().map_err(|_| AuthError::BadFormat)?;

        let signature = hex::decode(signature).map_err(|_| AuthError::BadSignature)?;
        self.mac(identity, timestamp)
            .verify_slice(&signature)
            .map_err(|_| AuthError::BadSignature)?;

        if now.saturating_sub(issued_at) > API_KEY_LIFETIME.as_secs() {
            return Err(AuthError::Expired);
        }
        Ok(identity.to_owned())
    }
}
