//! Tests for request fingerprinting.

use muninn::{CompletionRequest, Fingerprint, Language, RequestLimits};

fn build(builder: muninn::CompletionRequestBuilder) -> CompletionRequest {
    builder.build(&RequestLimits::default()).unwrap()
}

fn base() -> muninn::CompletionRequestBuilder {
    CompletionRequest::builder("def fib(n):\n    ", Language::Python)
        .context("recursive helper")
        .max_tokens(50)
        .temperature(0.2)
}

#[test]
fn identical_requests_share_a_fingerprint() {
    assert_eq!(Fingerprint::of(&build(base())), Fingerprint::of(&build(base())));
}

#[test]
fn fingerprint_is_hex_sha256() {
    let fp = Fingerprint::of(&build(base()));
    assert_eq!(fp.as_str().len(), 64);
    assert!(fp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn user_id_does_not_affect_fingerprint() {
    let anonymous = Fingerprint::of(&build(base()));
    let alice = Fingerprint::of(&build(base().user_id("alice")));
    let bob = Fingerprint::of(&build(base().user_id("bob")));
    assert_eq!(anonymous, alice);
    assert_eq!(alice, bob);
}

#[test]
fn every_semantic_field_changes_the_fingerprint() {
    let reference = Fingerprint::of(&build(base()));
    let variants = [
        CompletionRequest::builder("def fib(m):\n    ", Language::Python)
            .context("recursive helper")
            .max_tokens(50)
            .temperature(0.2),
        CompletionRequest::builder("def fib(n):\n    ", Language::Rust)
            .context("recursive helper")
            .max_tokens(50)
            .temperature(0.2),
        base().context("iterative helper"),
        base().max_tokens(51),
        base().temperature(0.3),
    ];
    for variant in variants {
        assert_ne!(Fingerprint::of(&build(variant)), reference);
    }
}

#[test]
fn empty_context_equals_absent_context() {
    let with_empty = CompletionRequest::builder("x", Language::Go).context("");
    let without = CompletionRequest::builder("x", Language::Go);
    assert_eq!(
        Fingerprint::of(&build(with_empty)),
        Fingerprint::of(&build(without))
    );
}

#[test]
fn field_boundaries_are_unambiguous() {
    // Moving text between code and context must not collide.
    let a = CompletionRequest::builder("ab", Language::Go).context("c");
    let b = CompletionRequest::builder("a", Language::Go).context("bc");
    assert_ne!(Fingerprint::of(&build(a)), Fingerprint::of(&build(b)));
}
