// crates/qlog-core/tests/record_decode.rs
// ============================================================================
// Module: Execution Record Decoding Tests
// Description: Validate transport message decoding.
// Purpose: Ensure malformed payloads are rejected with the right error kind.
// Dependencies: qlog-core, serde_json
// ============================================================================

//! ## Overview
//! Decoding tests for the paid-query transport message, including the nested
//! JSON-encoded query blob and string-encoded fees.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use qlog_core::DecodeError;
use qlog_core::ExecutionRecord;
use qlog_core::IdentifierError;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const DATASET: &str = "QmTXzATwNfgGVukV1fX2T6xw9f6LAYRVWpsdXyRWzUR2H9";

fn message(overrides: &Value) -> Vec<u8> {
    let mut base = json!({
        "msg": "Done executing paid query",
        "time": 1_700_000_000_000_i64,
        "responseTime": 42,
        "deployment": DATASET,
        "query": "{\"query\":\"query Foo($a:Int){field(arg:1,other:$a)}\",\"variables\":{\"a\":5}}",
        "fees": "1000",
    });
    if let (Value::Object(base_map), Value::Object(extra)) = (&mut base, overrides) {
        for (key, value) in extra {
            base_map.insert(key.clone(), value.clone());
        }
    }
    serde_json::to_vec(&base).unwrap()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn decodes_paid_query_record() {
    let record = ExecutionRecord::decode(&message(&json!({}))).unwrap();
    assert_eq!(record.timestamp_ms, 1_700_000_000_000);
    assert_eq!(record.response_time_ms, 42);
    assert_eq!(record.dataset.as_str(), DATASET);
    assert_eq!(record.query, "query Foo($a:Int){field(arg:1,other:$a)}");
    assert_eq!(record.variables, json!({"a": 5}));
    assert_eq!(record.fees, 1000);
}

#[test]
fn fees_larger_than_u64_are_kept() {
    let record =
        ExecutionRecord::decode(&message(&json!({"fees": "340282366920938463463374607431768211455"})))
            .unwrap();
    assert_eq!(record.fees, u128::MAX);
}

#[test]
fn missing_variables_decode_as_null() {
    let record =
        ExecutionRecord::decode(&message(&json!({"query": "{\"query\":\"{ a }\"}"}))).unwrap();
    assert_eq!(record.variables, Value::Null);
}

#[test]
fn serialized_variables_are_left_for_the_pipeline() {
    let record = ExecutionRecord::decode(&message(
        &json!({"query": "{\"query\":\"{ a }\",\"variables\":\"{\\\"x\\\":1}\"}"}),
    ))
    .unwrap();
    assert_eq!(record.variables, Value::String("{\"x\":1}".to_string()));
}

#[test]
fn rejects_other_message_kinds() {
    let err = ExecutionRecord::decode(&message(&json!({"msg": "Received query"}))).unwrap_err();
    assert_eq!(err, DecodeError::Sentinel("Received query".to_string()));
}

#[test]
fn rejects_invalid_utf8() {
    let err = ExecutionRecord::decode(&[0xff, 0xfe, 0x00]).unwrap_err();
    assert_eq!(err, DecodeError::Utf8);
}

#[test]
fn rejects_non_json_body() {
    let err = ExecutionRecord::decode(b"not json").unwrap_err();
    assert!(matches!(err, DecodeError::Json(_)));
}

#[test]
fn rejects_missing_fields() {
    let err = ExecutionRecord::decode(br#"{"msg":"Done executing paid query"}"#).unwrap_err();
    assert!(matches!(err, DecodeError::Json(_)));
}

#[test]
fn rejects_malformed_dataset() {
    let err = ExecutionRecord::decode(&message(&json!({"deployment": "Qm123"}))).unwrap_err();
    assert_eq!(err, DecodeError::Dataset(IdentifierError::Length(5)));
    let bad = format!("{}!", &DATASET[.. 45]);
    let err = ExecutionRecord::decode(&message(&json!({"deployment": bad}))).unwrap_err();
    assert_eq!(err, DecodeError::Dataset(IdentifierError::Alphabet));
}

#[test]
fn rejects_malformed_query_blob() {
    let err = ExecutionRecord::decode(&message(&json!({"query": "{ a }"}))).unwrap_err();
    assert!(matches!(err, DecodeError::QueryBlob(_)));
}

#[test]
fn rejects_non_integer_fees() {
    for fees in ["-1", "1.5", "lots", ""] {
        let err = ExecutionRecord::decode(&message(&json!({"fees": fees}))).unwrap_err();
        assert!(matches!(err, DecodeError::Fees(_)), "fees {fees:?} should be rejected");
    }
}
