//! Tests for domain error construction and serialisation.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::not_found("missing"), ErrorCode::NotFound)]
#[case(Error::conflict("taken"), ErrorCode::Conflict)]
#[case(Error::service_unavailable("down"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_code(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[test]
fn new_has_no_correlation_id_out_of_scope() {
    let error = Error::internal("boom");
    assert!(error.correlation_id().is_none());
}

#[tokio::test]
async fn new_captures_correlation_id_in_scope() {
    let id = CorrelationId::parse("req-1").expect("valid id");
    let error = CorrelationId::scope(id, async { Error::not_found("missing") }).await;
    assert_eq!(error.correlation_id(), Some("req-1"));
}

#[test]
fn serialises_camel_case_and_skips_empty_fields() {
    let value = serde_json::to_value(Error::conflict("taken")).expect("serialise error");
    assert_eq!(value, json!({ "code": "conflict", "message": "taken" }));
}

#[test]
fn serialises_correlation_id_and_details() {
    let error = Error::invalid_request("bad")
        .with_correlation_id("abc")
        .with_details(json!({ "field": "email" }));
    let value = serde_json::to_value(&error).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "code": "invalid_request",
            "message": "bad",
            "correlationId": "abc",
            "details": { "field": "email" }
        })
    );
    let decoded: Error = serde_json::from_value(value).expect("deserialise error");
    assert_eq!(decoded, error);
}

#[test]
fn display_uses_message() {
    assert_eq!(Error::not_found("user not found").to_string(), "user not found");
}
