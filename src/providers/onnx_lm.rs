//! Causal language-model generation via ONNX Runtime.
//!
//! Runs decoder-only models exported with `input_ids` and `attention_mask`
//! inputs and a `logits` output of shape `[batch, seq, vocab]`. Each step
//! re-runs the full sequence (no KV cache), which is adequate for the
//! short continuations code completion asks for.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use super::local::{Cancellation, SamplingParams, TextGenerator};
use crate::error::{MuninnError, Result};

/// Compute device for local inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Device {
    #[default]
    Cpu,

    #[cfg(feature = "cuda")]
    Cuda {
        /// GPU device ID (0-indexed).
        device_id: u32,
    },
}

/// Where a local model's files come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// Download `onnx/model.onnx` and `tokenizer.json` from a HuggingFace repo.
    Hub { repo_id: String },
    /// Use files already on disk.
    Files {
        model_path: PathBuf,
        tokenizer_path: PathBuf,
    },
}

impl ModelSource {
    /// Resolve to `(model_path, tokenizer_path)`, downloading if needed.
    pub fn resolve(&self) -> Result<(PathBuf, PathBuf)> {
        match self {
            Self::Files {
                model_path,
                tokenizer_path,
            } => Ok((model_path.clone(), tokenizer_path.clone())),
            Self::Hub { repo_id } => download_model(repo_id),
        }
    }
}

/// ONNX causal LM implementing [`TextGenerator`].
pub struct OnnxCausalLm {
    session: Mutex<Session>,
}

impl OnnxCausalLm {
    pub fn from_file(model_path: &Path, device: Device) -> Result<Self> {
        Ok(Self {
            session: Mutex::new(build_session(model_path, device)?),
        })
    }

    /// Logits for the next token after `ids`.
    fn next_token_logits(&self, ids: &[i64]) -> Result<Vec<f32>> {
        use ort::value::TensorRef;

        let shape = [1_usize, ids.len()];
        let attention_mask = vec![1_i64; ids.len()];

        let input_ids_tensor = TensorRef::from_array_view((shape, ids)).map_err(|e| {
            MuninnError::Inference(format!("Failed to create input_ids tensor: {e}"))
        })?;
        let attention_mask_tensor = TensorRef::from_array_view((shape, attention_mask.as_slice()))
            .map_err(|e| {
                MuninnError::Inference(format!("Failed to create attention_mask tensor: {e}"))
            })?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| MuninnError::Inference("ONNX session lock poisoned".into()))?;
        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
            ])
            .map_err(|e| MuninnError::Inference(format!("ONNX inference failed: {e}")))?;

        let logits = outputs
            .get("logits")
            .ok_or_else(|| MuninnError::Inference("No logits output found".into()))?;
        let (tensor_shape, data) = logits
            .try_extract_tensor::<f32>()
            .map_err(|e| MuninnError::Inference(format!("Failed to extract logits: {e}")))?;

        if tensor_shape.len() != 3 {
            return Err(MuninnError::Inference(format!(
                "expected [batch, seq, vocab] logits, got {} dims",
                tensor_shape.len()
            )));
        }
        let vocab = tensor_shape[2] as usize;
        let last = data.len().checked_sub(vocab).ok_or_else(|| {
            MuninnError::Inference("logits shorter than vocabulary".into())
        })?;
        Ok(data[last..].to_vec())
    }
}

impl TextGenerator for OnnxCausalLm {
    fn generate(
        &self,
        prompt: &[u32],
        params: &SamplingParams,
        cancel: &Cancellation,
    ) -> Result<Vec<Vec<u32>>> {
        let mut rng = rand::thread_rng();
        let mut samples = Vec::with_capacity(params.num_samples);

        for _ in 0..params.num_samples {
            let mut ids: Vec<i64> = prompt.iter().map(|&id| i64::from(id)).collect();
            for _ in 0..params.max_new_tokens {
                cancel.check()?;
                let logits = self.next_token_logits(&ids)?;
                let next = sample_token(&logits, params.temperature, &mut rng);
                if Some(next) == params.eos_token_id {
                    break;
                }
                ids.push(i64::from(next));
            }
            samples.push(ids.into_iter().map(|id| id as u32).collect());
        }
        Ok(samples)
    }
}

/// Pick the next token: argmax at temperature 0, otherwise a draw from the
/// temperature-scaled softmax.
fn sample_token(logits: &[f32], temperature: f32, rng: &mut impl Rng) -> u32 {
    if temperature <= 0.0 {
        return argmax(logits);
    }
    let scaled: Vec<f32> = logits.iter().map(|l| l / temperature).collect();
    match WeightedIndex::new(softmax(&scaled)) {
        Ok(dist) => dist.sample(rng) as u32,
        Err(_) => argmax(logits),
    }
}

fn argmax(logits: &[f32]) -> u32 {
    logits
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i as u32)
        .unwrap_or_default()
}

/// Softmax function.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|x| x / sum).collect()
}

/// Build an ONNX session with the appropriate execution provider.
fn build_session(model_path: &Path, device: Device) -> Result<Session> {
    let builder = Session::builder()
        .map_err(|e| MuninnError::Configuration(format!("Failed to create session builder: {e}")))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| MuninnError::Configuration(format!("Failed to set optimization level: {e}")))?;

    let builder = match device {
        Device::Cpu => builder,
        #[cfg(feature = "cuda")]
        Device::Cuda { device_id } => {
            use ort::execution_providers::CUDAExecutionProvider;
            builder
                .with_execution_providers([CUDAExecutionProvider::default()
                    .with_device_id(device_id as i32)
                    .build()])
                .map_err(|e| MuninnError::Configuration(format!("Failed to configure CUDA: {e}")))?
        }
    };

    builder
        .commit_from_file(model_path)
        .map_err(|e| MuninnError::Configuration(format!("Failed to load ONNX model: {e}")))
}

/// Download model and tokenizer from HuggingFace Hub.
fn download_model(repo_id: &str) -> Result<(PathBuf, PathBuf)> {
    use hf_hub::api::sync::Api;

    let api = Api::new().map_err(|e| {
        MuninnError::Configuration(format!("Failed to initialize HF Hub API: {e}"))
    })?;
    let repo = api.model(repo_id.to_string());

    let model_path = repo.get("onnx/model.onnx").map_err(|e| {
        MuninnError::Configuration(format!("Failed to download ONNX model from {repo_id}: {e}"))
    })?;
    let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
        MuninnError::Configuration(format!("Failed to download tokenizer from {repo_id}: {e}"))
    })?;

    Ok((model_path, tokenizer_path))
}
