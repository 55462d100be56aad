//! Completion request and its validating builder.

use serde::{Deserialize, Serialize};

use super::Language;
use crate::{MuninnError, Result};

/// Upper bounds enforced when a request is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestLimits {
    /// Maximum code length in characters.
    pub max_code_length: usize,
    /// Maximum generation budget a caller may ask for.
    pub max_tokens: u32,
}

impl Default for RequestLimits {
    fn default() -> Self {
        Self {
            max_code_length: 10_000,
            max_tokens: 500,
        }
    }
}

/// A validated completion request.
///
/// Only constructible through [`CompletionRequestBuilder::build`], so every
/// instance is within the configured limits.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    code: String,
    language: Language,
    context: Option<String>,
    max_tokens: u32,
    temperature: f32,
    user_id: Option<String>,
}

impl CompletionRequest {
    /// Start building a request for `code` in `language`.
    pub fn builder(code: impl Into<String>, language: Language) -> CompletionRequestBuilder {
        CompletionRequestBuilder::new(code, language)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    /// Caller identity. Used for auditing only; never part of the cache key.
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Last line of the code, the text immediately before the cursor.
    pub fn last_line(&self) -> &str {
        self.code.rsplit('\n').next().unwrap_or_default()
    }
}

fn default_max_tokens() -> u32 {
    100
}

fn default_temperature() -> f32 {
    0.7
}

/// Unvalidated request fields.
///
/// Deserializes directly from a JSON request body; omitted fields take the
/// same defaults as [`CompletionRequestBuilder::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequestBuilder {
    pub code: String,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl CompletionRequestBuilder {
    pub fn new(code: impl Into<String>, language: Language) -> Self {
        Self {
            code: code.into(),
            language,
            context: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            user_id: None,
        }
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Validate against `limits` and produce an immutable request.
    ///
    /// Code must hold at least one character; whitespace-only buffers are
    /// valid. An empty context is treated as no context.
    pub fn build(self, limits: &RequestLimits) -> Result<CompletionRequest> {
        if self.code.is_empty() {
            return Err(MuninnError::InvalidRequest("code must not be empty".into()));
        }
        let length = self.code.chars().count();
        if length > limits.max_code_length {
            return Err(MuninnError::InvalidRequest(format!(
                "code is {length} characters, limit is {}",
                limits.max_code_length
            )));
        }
        if self.max_tokens == 0 || self.max_tokens > limits.max_tokens {
            return Err(MuninnError::InvalidRequest(format!(
                "max_tokens must be between 1 and {}, got {}",
                limits.max_tokens, self.max_tokens
            )));
        }
        if !self.temperature.is_finite() || !(0.0..=1.0).contains(&self.temperature) {
            return Err(MuninnError::InvalidRequest(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }

        Ok(CompletionRequest {
            code: self.code,
            language: self.language,
            context: self.context.filter(|c| !c.is_empty()),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            user_id: self.user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let req = CompletionRequest::builder("x = 1", Language::Python)
            .build(&RequestLimits::default())
            .unwrap();
        assert_eq!(req.max_tokens(), 100);
        assert!((req.temperature() - 0.7).abs() < f32::EPSILON);
        assert!(req.context().is_none());
        assert!(req.user_id().is_none());
    }

    #[test]
    fn empty_context_becomes_none() {
        let req = CompletionRequest::builder("x", Language::Go)
            .context("")
            .build(&RequestLimits::default())
            .unwrap();
        assert!(req.context().is_none());
    }

    #[test]
    fn last_line_is_text_after_final_newline() {
        let req = CompletionRequest::builder("def fib(n):\n    ", Language::Python)
            .build(&RequestLimits::default())
            .unwrap();
        assert_eq!(req.last_line(), "    ");
    }

    #[test]
    fn deserialize_applies_defaults() {
        let builder: CompletionRequestBuilder =
            serde_json::from_str(r#"{"code": "fn main() {", "language": "rust"}"#).unwrap();
        assert_eq!(builder.max_tokens, 100);
        assert_eq!(builder.language, Language::Rust);
    }

    #[test]
    fn deserialize_rejects_unknown_language() {
        let result: std::result::Result<CompletionRequestBuilder, _> =
            serde_json::from_str(r#"{"code": "x", "language": "cobol"}"#);
        assert!(result.is_err());
    }
}
