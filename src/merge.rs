//! Merging provider output into one ranked result.

use std::time::Duration;

use crate::providers::ChainOutcome;
use crate::types::{CompletionCandidate, CompletionRequest, CompletionResult, ProviderKind};

/// Candidates kept in a result.
pub const MAX_CANDIDATES: usize = 5;

/// Rank, truncate and annotate everything the chain produced.
///
/// Candidates are ordered by confidence, highest first. The sort is stable,
/// so ties keep invocation order and each provider's own order. The
/// reasoning counts candidates before truncation. `model_used` names the
/// provider of the top candidate, so a remote answer labels the result even
/// when a local model also contributed.
pub fn merge(
    request: &CompletionRequest,
    outcome: &ChainOutcome,
    processing_time: Duration,
) -> CompletionResult {
    let mut candidates: Vec<CompletionCandidate> = outcome.candidates().cloned().collect();
    let produced = candidates.len();
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.truncate(MAX_CANDIDATES);

    let model_used = match candidates.first() {
        Some(top) => top.provider,
        None => last_ran(outcome),
    };

    CompletionResult {
        candidates,
        reasoning: reasoning(request, produced),
        model_used,
        processing_time,
    }
}

/// Label when nothing was produced: the last provider that ran.
fn last_ran(outcome: &ChainOutcome) -> ProviderKind {
    outcome
        .attempts
        .iter()
        .rev()
        .find(|(_, attempt)| attempt.ran())
        .map(|(kind, _)| *kind)
        .unwrap_or(ProviderKind::RuleBased)
}

fn reasoning(request: &CompletionRequest, produced: usize) -> String {
    if produced == 0 {
        return "No suggestions available".to_owned();
    }
    let language = request.language();
    let context = request
        .context()
        .map(|context| format!("context '{context}' and "))
        .unwrap_or_default();
    format!(
        "Generated {produced} suggestions for {language} code based on {context}current code structure. \
         Top suggestions focus on common patterns and best practices for {language}."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MuninnError;
    use crate::providers::Attempt;
    use crate::types::{Language, RequestLimits};

    fn request(context: Option<&str>) -> CompletionRequest {
        let mut builder = CompletionRequest::builder("def fib(n):\n    ", Language::Python);
        if let Some(context) = context {
            builder = builder.context(context);
        }
        builder.build(&RequestLimits::default()).unwrap()
    }

    fn candidates(kind: ProviderKind, texts: &[&str]) -> (ProviderKind, Attempt) {
        (
            kind,
            Attempt::Candidates(
                texts
                    .iter()
                    .map(|t| CompletionCandidate::from_provider(*t, kind))
                    .collect(),
            ),
        )
    }

    #[test]
    fn ranks_by_confidence_and_truncates() {
        let outcome = ChainOutcome {
            attempts: vec![
                candidates(ProviderKind::LocalModel, &["l1", "l2", "l3"]),
                candidates(ProviderKind::RemoteLlm, &["r1", "r2", "r3"]),
            ],
        };
        let result = merge(&request(None), &outcome, Duration::ZERO);

        let texts: Vec<_> = result.suggestions().collect();
        assert_eq!(texts, vec!["r1", "r2", "r3", "l1", "l2"]);
        assert!(result.reasoning.starts_with("Generated 6 suggestions for python code"));
    }

    #[test]
    fn model_used_prefers_highest_trust_provider() {
        let outcome = ChainOutcome {
            attempts: vec![
                candidates(ProviderKind::LocalModel, &["l1"]),
                candidates(ProviderKind::RemoteLlm, &["r1"]),
            ],
        };
        let result = merge(&request(None), &outcome, Duration::ZERO);
        assert_eq!(result.model_used, ProviderKind::RemoteLlm);
    }

    #[test]
    fn model_used_skips_providers_without_candidates() {
        let outcome = ChainOutcome {
            attempts: vec![
                (ProviderKind::RemoteLlm, Attempt::Candidates(vec![])),
                candidates(ProviderKind::LocalModel, &["x"]),
            ],
        };
        let result = merge(&request(None), &outcome, Duration::ZERO);
        assert_eq!(result.model_used, ProviderKind::LocalModel);
    }

    #[test]
    fn model_used_falls_back_to_last_provider_that_ran() {
        let outcome = ChainOutcome {
            attempts: vec![
                (
                    ProviderKind::RemoteLlm,
                    Attempt::Failed(MuninnError::AuthenticationFailed),
                ),
                (ProviderKind::LocalModel, Attempt::Skipped),
                (ProviderKind::RuleBased, Attempt::Candidates(vec![])),
            ],
        };
        let result = merge(&request(None), &outcome, Duration::ZERO);
        assert_eq!(result.model_used, ProviderKind::RuleBased);
        assert!(result.candidates.is_empty());
        assert_eq!(result.reasoning, "No suggestions available");
    }

    #[test]
    fn reasoning_mentions_context_when_supplied() {
        let outcome = ChainOutcome {
            attempts: vec![candidates(ProviderKind::RuleBased, &["def "])],
        };
        let result = merge(&request(Some("fibonacci")), &outcome, Duration::ZERO);
        assert_eq!(
            result.reasoning,
            "Generated 1 suggestions for python code based on context 'fibonacci' and current code structure. \
             Top suggestions focus on common patterns and best practices for python."
        );
    }
}
