//! Caching subsystem.
//!
//! [`ResponseCache`] stores merged completion results keyed on the request
//! [`Fingerprint`](crate::Fingerprint). It is opt-out: a
//! [`CacheConfig`] with `max_entries(0)` allocates nothing and the engine
//! computes every request directly.

pub mod response;

pub use response::{CacheConfig, CacheEntry, MAX_CACHE_TTL, ResponseCache};
