//! Remote LLM provider over an OpenAI-compatible chat-completions API.
//!
//! One request asks for `fan_out` independent choices (`n`), so a single
//! round trip yields several suggestions. Transient failures are retried
//! with backoff; the chain's timeout bounds the whole attempt, retries
//! included.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::retry::{RetryConfig, with_retry};
use super::traits::CompletionProvider;
use crate::types::{CompletionRequest, Language, ProviderKind};
use crate::{MuninnError, Result};

/// Default base URL for the OpenAI API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default number of choices requested per call.
pub const DEFAULT_FAN_OUT: u32 = 3;

/// Default bound on a single HTTP call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const SYSTEM_PROMPT: &str = "You are an expert code completion assistant. Provide only code suggestions without explanations.";

/// Client for a chat-completions endpoint.
#[derive(Clone)]
pub struct RemoteLlmProvider {
    api_key: String,
    http: Client,
    base_url: String,
    model: String,
    fan_out: u32,
    request_timeout: Duration,
    retry: RetryConfig,
}

impl RemoteLlmProvider {
    /// Create a provider for the OpenAI API with the given key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a provider with a custom base URL (compatible gateways, or
    /// wiremock in tests).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.into(),
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            fan_out: DEFAULT_FAN_OUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryConfig::default(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of choices requested per call (minimum 1).
    pub fn fan_out(mut self, n: u32) -> Self {
        self.fan_out = n.max(1);
        self
    }

    /// Bound on one HTTP call. A call that overruns fails with
    /// [`MuninnError::Timeout`] and is retried like any transient error.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// User prompt embedding language, context and code.
    pub fn prompt(request: &CompletionRequest) -> String {
        format!(
            "Complete the following {language} code. Provide only the code completion without explanations.\n\n\
             Context: {context}\n\n\
             Code:\n{code}\n\n\
             Complete the code:",
            language = request.language(),
            context = request.context().unwrap_or_default(),
            code = request.code(),
        )
    }

    async fn chat_completions(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let prompt = Self::prompt(request);
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            max_tokens: request.max_tokens(),
            temperature: request.temperature(),
            n: self.fan_out,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        handle_response_errors(&response)?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.transport_error(e))?;

        Ok(parsed
            .choices
            .into_iter()
            .filter_map(|choice| choice.message.content)
            .map(|content| content.trim().to_owned())
            .filter(|content| !content.is_empty())
            .collect())
    }
}

impl RemoteLlmProvider {
    fn transport_error(&self, err: reqwest::Error) -> MuninnError {
        if err.is_timeout() {
            MuninnError::Timeout(self.request_timeout)
        } else {
            MuninnError::Http(err.to_string())
        }
    }
}

/// Check response status and map to appropriate error.
fn handle_response_errors(response: &reqwest::Response) -> Result<()> {
    let status = response.status();

    if status.is_success() {
        return Ok(());
    }

    match status.as_u16() {
        401 => Err(MuninnError::AuthenticationFailed),
        429 => {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            Err(MuninnError::RateLimited { retry_after })
        }
        code => Err(MuninnError::Api {
            status: code,
            message: format!("chat completions API error: {status}"),
        }),
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
    n: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl CompletionProvider for RemoteLlmProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RemoteLlm
    }

    fn supports(&self, _language: Language) -> bool {
        true
    }

    async fn suggest(&self, request: &CompletionRequest) -> Result<Vec<String>> {
        with_retry(&self.retry, ProviderKind::RemoteLlm.as_str(), || {
            self.chat_completions(request)
        })
        .await
    }
}
