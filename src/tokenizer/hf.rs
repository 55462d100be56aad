//! HuggingFace tokenizers implementation.

use super::TokenizerProvider;
use crate::error::{MuninnError, Result};
use std::path::Path;

/// End-of-sequence spellings tried in order when resolving the EOS id.
const EOS_CANDIDATES: &[&str] = &["<|endoftext|>", "</s>", "<eos>", "<|end|>"];

/// HuggingFace tokenizers implementation.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    eos: Option<u32>,
}

impl HfTokenizer {
    /// Load tokenizer from HuggingFace Hub.
    ///
    /// Downloads the tokenizer if not cached locally.
    pub fn from_hub(repo_id: &str) -> Result<Self> {
        let api = hf_hub::api::sync::Api::new().map_err(|e| {
            MuninnError::Configuration(format!("Failed to initialize HF API: {e}"))
        })?;

        let tokenizer_path = api
            .model(repo_id.to_string())
            .get("tokenizer.json")
            .map_err(|e| {
                MuninnError::Configuration(format!(
                    "Failed to download tokenizer from {repo_id}: {e}"
                ))
            })?;

        Self::from_file(&tokenizer_path)
    }

    /// Load tokenizer from local file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| {
            MuninnError::Configuration(format!("Failed to load tokenizer from {path:?}: {e}"))
        })?;
        let eos = EOS_CANDIDATES
            .iter()
            .find_map(|token| inner.token_to_id(token));

        Ok(Self { inner, eos })
    }
}

impl TokenizerProvider for HfTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| MuninnError::Inference(format!("Tokenization failed: {e}")))?;

        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, ids: &[u32]) -> Result<String> {
        self.inner
            .decode(ids, true)
            .map_err(|e| MuninnError::Inference(format!("Detokenization failed: {e}")))
    }

    fn eos_token_id(&self) -> Option<u32> {
        self.eos
    }
}
