//! Cache keys for completion requests.
//!
//! A [`Fingerprint`] is the SHA-256 digest of the fields that determine a
//! completion's content: code, language, max tokens, temperature and
//! context, hashed in that order. Every field is length-prefixed so no
//! choice of field contents can shift a boundary and collide with another
//! request. The caller identity is deliberately left out: identical requests
//! from different users share one cache entry.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::types::CompletionRequest;

/// Hex-encoded SHA-256 request digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Derive the fingerprint of `request`.
    pub fn of(request: &CompletionRequest) -> Self {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, request.code().as_bytes());
        write_field(&mut hasher, request.language().as_str().as_bytes());
        write_field(&mut hasher, &request.max_tokens().to_le_bytes());
        // bit pattern, so 0.7 and 0.70000005 stay distinct
        write_field(&mut hasher, &request.temperature().to_bits().to_le_bytes());
        match request.context() {
            Some(context) => {
                hasher.update([1u8]);
                write_field(&mut hasher, context.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn write_field(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Language, RequestLimits};

    fn request(code: &str) -> crate::types::CompletionRequestBuilder {
        CompletionRequest::builder(code, Language::Python)
    }

    fn build(builder: crate::types::CompletionRequestBuilder) -> CompletionRequest {
        builder.build(&RequestLimits::default()).unwrap()
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let fp = Fingerprint::of(&build(request("x")));
        assert_eq!(fp.as_str().len(), 64);
        assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn field_boundaries_do_not_collide() {
        // "ab" + context "c" vs "a" + context "bc" must differ even though
        // the concatenated bytes are equal.
        let a = Fingerprint::of(&build(request("ab").context("c")));
        let b = Fingerprint::of(&build(request("a").context("bc")));
        assert_ne!(a, b);
    }

    #[test]
    fn absent_context_differs_from_present() {
        let a = Fingerprint::of(&build(request("x")));
        let b = Fingerprint::of(&build(request("x").context("x")));
        assert_ne!(a, b);
    }
}
