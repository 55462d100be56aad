//! Tests for request validation at build time.

use muninn::{CompletionRequest, CompletionRequestBuilder, Language, MuninnError, RequestLimits};

fn build(builder: CompletionRequestBuilder) -> muninn::Result<CompletionRequest> {
    builder.build(&RequestLimits::default())
}

fn assert_invalid(result: muninn::Result<CompletionRequest>) {
    assert!(
        matches!(result, Err(MuninnError::InvalidRequest(_))),
        "expected InvalidRequest, got {result:?}"
    );
}

#[test]
fn defaults_are_applied() {
    let request = build(CompletionRequest::builder("x = ", Language::Python)).unwrap();
    assert_eq!(request.max_tokens(), 100);
    assert_eq!(request.temperature(), 0.7);
    assert_eq!(request.context(), None);
    assert_eq!(request.user_id(), None);
}

#[test]
fn empty_code_is_rejected() {
    assert_invalid(build(CompletionRequest::builder("", Language::Python)));
}

#[test]
fn whitespace_only_code_is_accepted() {
    for code in ["    ", "\n", " \n\t "] {
        let request = build(CompletionRequest::builder(code, Language::Python))
            .unwrap_or_else(|e| panic!("{code:?} rejected: {e}"));
        assert_eq!(request.code(), code);
    }
}

#[test]
fn code_length_limit_is_inclusive() {
    let at_limit = "x".repeat(10_000);
    assert!(build(CompletionRequest::builder(at_limit, Language::Go)).is_ok());

    let over = "x".repeat(10_001);
    assert_invalid(build(CompletionRequest::builder(over, Language::Go)));
}

#[test]
fn code_length_counts_characters() {
    // 10,000 multi-byte characters are within the limit.
    let wide = "é".repeat(10_000);
    assert!(build(CompletionRequest::builder(wide, Language::Java)).is_ok());
}

#[test]
fn max_tokens_bounds() {
    assert_invalid(build(CompletionRequest::builder("x", Language::Go).max_tokens(0)));
    assert!(build(CompletionRequest::builder("x", Language::Go).max_tokens(1)).is_ok());
    assert!(build(CompletionRequest::builder("x", Language::Go).max_tokens(500)).is_ok());
    assert_invalid(build(CompletionRequest::builder("x", Language::Go).max_tokens(501)));
}

#[test]
fn temperature_bounds() {
    assert!(build(CompletionRequest::builder("x", Language::Go).temperature(0.0)).is_ok());
    assert!(build(CompletionRequest::builder("x", Language::Go).temperature(1.0)).is_ok());
    assert_invalid(build(CompletionRequest::builder("x", Language::Go).temperature(-0.1)));
    assert_invalid(build(CompletionRequest::builder("x", Language::Go).temperature(1.01)));
    assert_invalid(build(CompletionRequest::builder("x", Language::Go).temperature(f32::NAN)));
}

#[test]
fn custom_limits_are_enforced() {
    let limits = RequestLimits {
        max_code_length: 4,
        max_tokens: 10,
    };
    assert!(CompletionRequest::builder("abcd", Language::Rust).build(&limits).is_ok());
    assert!(CompletionRequest::builder("abcde", Language::Rust).build(&limits).is_err());
    assert!(
        CompletionRequest::builder("a", Language::Rust)
            .max_tokens(11)
            .build(&limits)
            .is_err()
    );
}

#[test]
fn builder_deserializes_with_defaults() {
    let builder: CompletionRequestBuilder = serde_json::from_str(
        r#"{ "code": "def fib(n):", "language": "python", "context": "math" }"#,
    )
    .unwrap();
    let request = build(builder).unwrap();
    assert_eq!(request.language(), Language::Python);
    assert_eq!(request.context(), Some("math"));
    assert_eq!(request.max_tokens(), 100);
}

#[test]
fn unknown_language_fails_to_deserialize() {
    let result: Result<CompletionRequestBuilder, _> =
        serde_json::from_str(r#"{ "code": "x", "language": "cobol" }"#);
    assert!(result.is_err());
}

#[test]
fn language_parses_from_name() {
    assert_eq!("rust".parse::<Language>().unwrap(), Language::Rust);
    assert_eq!("cpp".parse::<Language>().unwrap(), Language::Cpp);
    assert!(matches!(
        "cobol".parse::<Language>(),
        Err(MuninnError::InvalidRequest(_))
    ));
}
