//! Property-based tests for response normalization
//!
//! Tests invariants:
//! - Exactly one of data/error is present, and status is always kept
//! - JSON error bodies resolve `error`, then `message`, then the status line,
//!   skipping blank strings
//! - Successful JSON bodies are returned unchanged
//! - Arbitrary bodies and content types never panic

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use crate::core::gateway::{normalize, RawResponse};

// ============================================================================
// Strategies
// ============================================================================

fn arb_error_status() -> impl Strategy<Value = u16> {
    400u16..600
}

fn arb_success_status() -> impl Strategy<Value = u16> {
    200u16..300
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,:!?-]{1,80}"
}

/// Small JSON documents shaped like edge-function replies.
fn arb_json() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        arb_text().prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn json_error_body_precedence(
        status in arb_error_status(),
        error in prop::option::of(arb_text()),
        message in prop::option::of(arb_text()),
        status_text in arb_text(),
    ) {
        let mut body = Map::new();
        if let Some(e) = &error {
            body.insert("error".to_string(), json!(e));
        }
        if let Some(m) = &message {
            body.insert("message".to_string(), json!(m));
        }
        let raw = RawResponse::json(status, &Value::Object(body)).with_status_text(status_text.clone());
        let result = normalize(raw);

        let present = |s: Option<String>| s.filter(|s| !s.trim().is_empty());
        let expected = present(error)
            .or(present(message))
            .unwrap_or_else(|| format!("HTTP {status}: {status_text}"));
        prop_assert!(!result.is_success());
        prop_assert_eq!(result.error(), Some(expected.as_str()));
        prop_assert_eq!(result.status(), Some(status));
    }

    #[test]
    fn success_json_is_returned_unchanged(status in arb_success_status(), body in arb_json()) {
        let result = normalize(RawResponse::json(status, &body));
        prop_assert!(result.is_success());
        prop_assert_eq!(result.data(), Some(&body));
    }

    #[test]
    fn text_error_is_prefixed_with_status(status in arb_error_status(), text in arb_text()) {
        let result = normalize(RawResponse::text(status, &text));
        let expected = format!("HTTP {status}: {text}");
        prop_assert_eq!(result.error(), Some(expected.as_str()));
    }

    #[test]
    fn arbitrary_bytes_never_panic(
        status in 100u16..600,
        json_declared in any::<bool>(),
        body in prop::collection::vec(any::<u8>(), 0..64),
    ) {
        let content_type = if json_declared { "application/json" } else { "text/plain" };
        let result = normalize(RawResponse::new(status, Some(content_type), body));

        prop_assert!(result.data().is_some() != result.error().is_some());
        prop_assert_eq!(result.status(), Some(status));
        if let Some(error) = result.error() {
            prop_assert!(!error.is_empty());
        }
    }
}
