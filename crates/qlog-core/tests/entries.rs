// crates/qlog-core/tests/entries.rs
// ============================================================================
// Module: Log Entry Tests
// Description: Validate log entry attribution and skeleton hashing.
// Purpose: Ensure timing and fees are attributed only to single-root records.
// Dependencies: qlog-core, serde_json
// ============================================================================

//! ## Overview
//! Attribution and hashing tests for [`LogEntry`] construction.

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

use qlog_core::DatasetId;
use qlog_core::ExecutionRecord;
use qlog_core::LogEntry;
use qlog_core::NormalizedQuery;
use qlog_core::SKELETON_HASH_BYTES;
use qlog_core::SkeletonHash;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn record() -> ExecutionRecord {
    ExecutionRecord {
        timestamp_ms: 1_700_000_000_000,
        response_time_ms: 42,
        dataset: DatasetId::parse("QmTXzATwNfgGVukV1fX2T6xw9f6LAYRVWpsdXyRWzUR2H9").unwrap(),
        query: "{ a b }".to_string(),
        variables: Value::Null,
        fees: 1000,
    }
}

fn normalized(skeleton: &str, variables: Vec<Value>) -> NormalizedQuery {
    NormalizedQuery {
        skeleton: skeleton.to_string(),
        variables,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn single_root_records_keep_timing_and_fees() {
    let entries = LogEntry::from_record(&record(), vec![normalized("{a}", vec![json!(1)])]);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].response_time_ms, Some(42));
    assert_eq!(entries[0].fees, Some(1000));
    assert_eq!(entries[0].variables, Some(vec![json!(1)]));
    assert_eq!(entries[0].skeleton_hash, SkeletonHash::of_text("{a}"));
}

#[test]
fn multi_root_records_null_timing_and_fees() {
    let entries = LogEntry::from_record(
        &record(),
        vec![normalized("{a}", Vec::new()), normalized("{b}", Vec::new())],
    );
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!(entry.response_time_ms, None);
        assert_eq!(entry.fees, None);
        assert_eq!(entry.variables, None);
        assert_eq!(entry.timestamp_ms, 1_700_000_000_000);
    }
    assert_ne!(entries[0].skeleton_hash, entries[1].skeleton_hash);
}

#[test]
fn skeleton_hash_is_content_addressed() {
    let first = SkeletonHash::of_text("{field(arg:$_0)}");
    let second = SkeletonHash::of_text("{field(arg:$_0)}");
    assert_eq!(first, second);
    assert_eq!(first.as_bytes().len(), SKELETON_HASH_BYTES);
    assert_eq!(first.to_hex().len(), SKELETON_HASH_BYTES * 2);
    assert_eq!(SkeletonHash::from_slice(first.as_bytes()), Some(first));
    assert_eq!(SkeletonHash::from_slice(&[0_u8; 4]), None);
    assert_ne!(first, SkeletonHash::of_text("{field(arg:$_1)}"));
}
