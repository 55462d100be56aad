//! Local-model provider.
//!
//! Each supported language may have one [`LocalModel`]: a tokenizer plus a
//! [`TextGenerator`]. Generation is blocking and runs on tokio's blocking
//! pool so it never stalls the async workers. Dropping the provider future
//! (for example on the chain's timeout) raises a [`Cancellation`] that the
//! generator checks between tokens.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::traits::CompletionProvider;
use crate::tokenizer::TokenizerProvider;
use crate::types::{CompletionRequest, Language, ProviderKind};
use crate::{MuninnError, Result};

/// Prompt tokens kept; longer prompts keep only their tail.
pub const MAX_PROMPT_TOKENS: usize = 512;

/// Independent samples drawn per request.
pub const NUM_SAMPLES: usize = 3;

/// Generation parameters for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Tokens to generate per sample, at most.
    pub max_new_tokens: usize,
    /// 0 selects greedy decoding.
    pub temperature: f32,
    pub num_samples: usize,
    /// Stop a sample early on this token.
    pub eos_token_id: Option<u32>,
}

/// Shared flag telling a blocking generation that nobody awaits it anymore.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err` once cancelled; generators call this between tokens.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(MuninnError::Inference("generation cancelled".into()))
        } else {
            Ok(())
        }
    }
}

/// Cancels on drop.
struct CancelOnDrop(Cancellation);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// Autoregressive token generator.
pub trait TextGenerator: Send + Sync {
    /// Generate `params.num_samples` continuations of `prompt`.
    ///
    /// Each returned sequence is the full sequence: the prompt followed by
    /// the generated tokens. Implementations stop early with an error once
    /// `cancel` is raised.
    fn generate(
        &self,
        prompt: &[u32],
        params: &SamplingParams,
        cancel: &Cancellation,
    ) -> Result<Vec<Vec<u32>>>;
}

/// A tokenizer and generator pair serving one language.
#[derive(Clone)]
pub struct LocalModel {
    tokenizer: Arc<dyn TokenizerProvider>,
    generator: Arc<dyn TextGenerator>,
}

impl LocalModel {
    pub fn new(tokenizer: Arc<dyn TokenizerProvider>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            tokenizer,
            generator,
        }
    }

    /// Load an ONNX causal LM and its tokenizer.
    #[cfg(feature = "local-inference")]
    pub fn load(source: &super::onnx_lm::ModelSource, device: super::onnx_lm::Device) -> Result<Self> {
        let (model_path, tokenizer_path) = source.resolve()?;
        let tokenizer = crate::tokenizer::HfTokenizer::from_file(&tokenizer_path)?;
        let generator = super::onnx_lm::OnnxCausalLm::from_file(&model_path, device)?;
        Ok(Self::new(Arc::new(tokenizer), Arc::new(generator)))
    }

    /// Complete `code`, returning decoded, non-blank continuations.
    pub fn complete(&self, code: &str, max_new_tokens: usize, temperature: f32) -> Result<Vec<String>> {
        self.complete_cancellable(code, max_new_tokens, temperature, &Cancellation::new())
    }

    /// [`complete`](Self::complete), abandoning generation once `cancel` is raised.
    pub fn complete_cancellable(
        &self,
        code: &str,
        max_new_tokens: usize,
        temperature: f32,
        cancel: &Cancellation,
    ) -> Result<Vec<String>> {
        let mut prompt = self.tokenizer.tokenize(code)?;
        if prompt.len() > MAX_PROMPT_TOKENS {
            prompt.drain(..prompt.len() - MAX_PROMPT_TOKENS);
        }

        let params = SamplingParams {
            max_new_tokens,
            temperature,
            num_samples: NUM_SAMPLES,
            eos_token_id: self.tokenizer.eos_token_id(),
        };
        let sequences = self.generator.generate(&prompt, &params, cancel)?;

        let mut suggestions = Vec::with_capacity(sequences.len());
        for sequence in sequences {
            let Some(new_tokens) = sequence.get(prompt.len()..) else {
                continue;
            };
            let text = self.tokenizer.decode(new_tokens)?;
            let text = text.trim();
            if !text.is_empty() {
                suggestions.push(text.to_owned());
            }
        }
        Ok(suggestions)
    }
}

/// Serves languages that have a registered [`LocalModel`].
#[derive(Clone, Default)]
pub struct LocalModelProvider {
    models: HashMap<Language, LocalModel>,
}

impl LocalModelProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the model for `language`.
    pub fn insert(&mut self, language: Language, model: LocalModel) {
        self.models.insert(language, model);
    }

    /// Languages with a registered model, sorted.
    pub fn languages(&self) -> Vec<Language> {
        let mut languages: Vec<_> = self.models.keys().copied().collect();
        languages.sort();
        languages
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

#[async_trait]
impl CompletionProvider for LocalModelProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::LocalModel
    }

    fn supports(&self, language: Language) -> bool {
        self.models.contains_key(&language)
    }

    async fn suggest(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        let model = self
            .models
            .get(&request.language())
            .cloned()
            .ok_or(MuninnError::NoProvider)?;
        let code = request.code().to_owned();
        let max_new_tokens = request.max_tokens() as usize;
        let temperature = request.temperature();

        let cancel = Cancellation::new();
        let _guard = CancelOnDrop(cancel.clone());

        debug!(language = %request.language(), "running local model");
        tokio::task::spawn_blocking(move || {
            model.complete_cancellable(&code, max_new_tokens, temperature, &cancel)
        })
        .await
        .map_err(|e| MuninnError::Inference(format!("local inference task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// One token per character, decoding maps back to chars.
    struct CharTokenizer;

    impl TokenizerProvider for CharTokenizer {
        fn tokenize(&self, text: &str) -> Result<Vec<u32>> {
            Ok(text.chars().map(u32::from).collect())
        }

        fn decode(&self, ids: &[u32]) -> Result<String> {
            Ok(ids.iter().filter_map(|&id| char::from_u32(id)).collect())
        }
    }

    /// Appends fixed continuations and records the prompt it saw.
    struct Scripted {
        continuations: Vec<&'static str>,
        seen: Mutex<Option<(Vec<u32>, SamplingParams)>>,
    }

    impl TextGenerator for Scripted {
        fn generate(
            &self,
            prompt: &[u32],
            params: &SamplingParams,
            _cancel: &Cancellation,
        ) -> Result<Vec<Vec<u32>>> {
            *self.seen.lock().unwrap() = Some((prompt.to_vec(), params.clone()));
            Ok(self
                .continuations
                .iter()
                .map(|c| prompt.iter().copied().chain(c.chars().map(u32::from)).collect())
                .collect())
        }
    }

    fn model(continuations: Vec<&'static str>) -> (LocalModel, Arc<Scripted>) {
        let generator = Arc::new(Scripted {
            continuations,
            seen: Mutex::new(None),
        });
        (LocalModel::new(Arc::new(CharTokenizer), generator.clone()), generator)
    }

    #[test]
    fn decodes_only_new_tokens_and_drops_blanks() {
        let (model, _) = model(vec!["  return 1\n", "   ", "pass"]);
        let suggestions = model.complete("def f():\n", 20, 0.7).unwrap();
        assert_eq!(suggestions, vec!["return 1", "pass"]);
    }

    #[test]
    fn long_prompts_keep_their_tail() {
        let (model, generator) = model(vec!["x"]);
        let code = format!("{}END", "a".repeat(600));
        model.complete(&code, 5, 0.0).unwrap();

        let (prompt, params) = generator.seen.lock().unwrap().clone().unwrap();
        assert_eq!(prompt.len(), MAX_PROMPT_TOKENS);
        assert!(prompt.ends_with(&[u32::from('E'), u32::from('N'), u32::from('D')]));
        assert_eq!(params.num_samples, NUM_SAMPLES);
        assert_eq!(params.max_new_tokens, 5);
    }

    #[tokio::test]
    async fn provider_supports_only_registered_languages() {
        let mut provider = LocalModelProvider::new();
        provider.insert(Language::Python, model(vec!["x"]).0);
        assert!(provider.supports(Language::Python));
        assert!(!provider.supports(Language::Java));
        assert_eq!(provider.languages(), vec![Language::Python]);
    }

    /// Emits one token per 5ms until done or cancelled.
    #[derive(Default)]
    struct Slow {
        steps: AtomicUsize,
        finished: AtomicBool,
    }

    impl TextGenerator for Slow {
        fn generate(
            &self,
            prompt: &[u32],
            params: &SamplingParams,
            cancel: &Cancellation,
        ) -> Result<Vec<Vec<u32>>> {
            let outcome = (|| -> Result<Vec<Vec<u32>>> {
                let mut ids = prompt.to_vec();
                for _ in 0..params.max_new_tokens {
                    cancel.check()?;
                    std::thread::sleep(Duration::from_millis(5));
                    self.steps.fetch_add(1, Ordering::SeqCst);
                    ids.push(u32::from('x'));
                }
                Ok(vec![ids])
            })();
            self.finished.store(true, Ordering::SeqCst);
            outcome
        }
    }

    #[tokio::test]
    async fn timed_out_generation_stops_between_tokens() {
        let generator = Arc::new(Slow::default());
        let mut provider = LocalModelProvider::new();
        provider.insert(
            Language::Python,
            LocalModel::new(Arc::new(CharTokenizer), generator.clone()),
        );
        let request = CompletionRequest::builder("x = ", Language::Python)
            .max_tokens(200)
            .build(&crate::types::RequestLimits::default())
            .unwrap();

        let attempt = tokio::time::timeout(Duration::from_millis(30), provider.suggest(&request)).await;
        assert!(attempt.is_err());

        for _ in 0..200 {
            if generator.finished.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(generator.finished.load(Ordering::SeqCst));
        assert!(generator.steps.load(Ordering::SeqCst) < 200);
    }

    #[test]
    fn cancellation_check_fails_once_raised() {
        let cancel = Cancellation::new();
        assert!(cancel.check().is_ok());
        cancel.clone().cancel();
        assert!(matches!(cancel.check(), Err(MuninnError::Inference(_))));
    }
}
