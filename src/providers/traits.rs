//! Provider trait and attempt outcomes.
//!
//! Every completion source implements [`CompletionProvider`]. Providers
//! report failure through `Result` from [`suggest`](CompletionProvider::suggest);
//! the chain only ever sees [`Attempt`] values, so a failing provider degrades
//! the candidate set instead of failing the request.
//!
//! # Availability
//!
//! A provider that cannot serve a language returns `false` from
//! [`supports`](CompletionProvider::supports) and is skipped without being
//! called. Skipping is not an error and does not mark the result degraded.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::types::{CompletionCandidate, CompletionRequest, Language, ProviderKind};
use crate::{MuninnError, Result};

/// A source of completion suggestions.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Which source this is; determines the candidates' confidence.
    fn kind(&self) -> ProviderKind;

    /// Whether this provider can serve `language` right now.
    fn supports(&self, language: Language) -> bool;

    /// Produce suggestion texts for `request`, best first.
    async fn suggest(&self, request: &CompletionRequest) -> Result<Vec<String>>;

    /// Run one attempt, converting errors into data.
    ///
    /// Default implementation checks [`supports`](Self::supports), calls
    /// [`suggest`](Self::suggest) and tags each text with this provider's
    /// fixed confidence.
    async fn attempt(&self, request: &CompletionRequest) -> Attempt {
        let kind = self.kind();
        if !self.supports(request.language()) {
            return Attempt::Skipped;
        }
        match self.suggest(request).await {
            Ok(texts) => Attempt::Candidates(
                texts
                    .into_iter()
                    .map(|text| CompletionCandidate::from_provider(text, kind))
                    .collect(),
            ),
            Err(e) => {
                warn!(provider = %kind, language = %request.language(), error = %e, "provider attempt failed");
                Attempt::Failed(e)
            }
        }
    }
}

/// Outcome of one provider attempt.
#[derive(Debug)]
pub enum Attempt {
    /// The provider ran; the list may be empty.
    Candidates(Vec<CompletionCandidate>),
    /// The provider ran and failed.
    Failed(MuninnError),
    /// The provider did not finish within the chain's timeout.
    TimedOut(Duration),
    /// The provider was not applicable and was not called.
    Skipped,
}

impl Attempt {
    /// Candidates produced, empty unless the attempt succeeded.
    pub fn candidates(&self) -> &[CompletionCandidate] {
        match self {
            Self::Candidates(c) => c,
            _ => &[],
        }
    }

    /// Whether the provider was actually invoked.
    pub fn ran(&self) -> bool {
        !matches!(self, Self::Skipped)
    }

    /// Whether this attempt lost candidates to a failure or timeout.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Failed(_) | Self::TimedOut(_))
    }

    /// Metrics label: "ok", "empty", "error", "timeout" or "skipped".
    pub fn status(&self) -> &'static str {
        match self {
            Self::Candidates(c) if c.is_empty() => "empty",
            Self::Candidates(_) => "ok",
            Self::Failed(_) => "error",
            Self::TimedOut(_) => "timeout",
            Self::Skipped => "skipped",
        }
    }
}
