//! Tokenizers for local-model completion.
//!
//! The local provider only needs to turn code into token IDs and newly
//! generated IDs back into text. [`HfTokenizer`] implements this over
//! HuggingFace `tokenizer.json` files when the `local-inference` feature is
//! enabled; tests and custom backends implement [`TokenizerProvider`]
//! directly.

#[cfg(feature = "local-inference")]
mod hf;

#[cfg(feature = "local-inference")]
pub use hf::HfTokenizer;

use crate::error::Result;

/// Trait for tokenizer implementations.
pub trait TokenizerProvider: Send + Sync {
    /// Tokenize text into token IDs, without special tokens.
    fn tokenize(&self, text: &str) -> Result<Vec<u32>>;

    /// Decode token IDs to text, skipping special tokens.
    fn decode(&self, ids: &[u32]) -> Result<String>;

    /// End-of-sequence token, if the vocabulary defines one.
    fn eos_token_id(&self) -> Option<u32> {
        None
    }
}
