//! Completion candidates and merged results.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize, Serializer};

/// Identity of a completion source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    /// Remote chat-completions API.
    RemoteLlm,
    /// Model loaded in-process for a specific language.
    LocalModel,
    /// Static per-language pattern table.
    RuleBased,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RemoteLlm => "remote-llm",
            Self::LocalModel => "local-model",
            Self::RuleBased => "rule-based",
        }
    }

    /// Fixed confidence assigned to every candidate from this source.
    pub fn confidence(&self) -> f32 {
        match self {
            Self::RemoteLlm => 0.9,
            Self::LocalModel => 0.7,
            Self::RuleBased => 0.5,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One suggested completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionCandidate {
    pub text: String,
    /// In `[0, 1]`.
    pub confidence: f32,
    pub provider: ProviderKind,
}

impl CompletionCandidate {
    /// Candidate carrying `provider`'s fixed confidence.
    pub fn from_provider(text: impl Into<String>, provider: ProviderKind) -> Self {
        Self {
            text: text.into(),
            confidence: provider.confidence(),
            provider,
        }
    }
}

/// Ranked, merged output of one engine computation.
///
/// Immutable once built; the engine hands it out behind an `Arc` so cache
/// readers share one allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionResult {
    /// Highest confidence first.
    pub candidates: Vec<CompletionCandidate>,
    pub reasoning: String,
    pub model_used: ProviderKind,
    #[serde(serialize_with = "serialize_secs")]
    pub processing_time: Duration,
}

impl CompletionResult {
    /// Suggestion texts in rank order.
    pub fn suggestions(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.text.as_str())
    }

    /// Confidence scores in rank order.
    pub fn confidence_scores(&self) -> impl Iterator<Item = f32> + '_ {
        self.candidates.iter().map(|c| c.confidence)
    }
}

fn serialize_secs<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_confidence_ordering() {
        assert!(ProviderKind::RemoteLlm.confidence() > ProviderKind::LocalModel.confidence());
        assert!(ProviderKind::LocalModel.confidence() > ProviderKind::RuleBased.confidence());
    }

    #[test]
    fn provider_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ProviderKind::RuleBased).unwrap();
        assert_eq!(json, "\"rule-based\"");
    }

    #[test]
    fn result_serializes_processing_time_as_seconds() {
        let result = CompletionResult {
            candidates: vec![CompletionCandidate::from_provider("pass", ProviderKind::RuleBased)],
            reasoning: "r".into(),
            model_used: ProviderKind::RuleBased,
            processing_time: Duration::from_millis(1500),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["processing_time"], 1.5);
        assert_eq!(value["model_used"], "rule-based");
        assert_eq!(value["candidates"][0]["text"], "pass");
    }
}
