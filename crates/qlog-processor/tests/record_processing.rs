// crates/qlog-processor/tests/record_processing.rs
// ============================================================================
// Module: Record Processing Tests
// Description: End-to-end record pipeline against a real SQLite store.
// Purpose: Verify persisted rows, fee accounting and failure dispositions.
// Dependencies: qlog-core, qlog-processor, qlog-store-sqlite, serde_json
// ============================================================================

//! ## Overview
//! Each test feeds transport messages through [`RecordProcessor`] and checks
//! what reached the store and the fee counter.

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

mod common;

use std::sync::Arc;

use common::FixedSchemas;
use common::Harness;
use common::dataset;
use common::paid_query;
use common::rejecting_processor;
use qlog_core::SkeletonHash;
use qlog_core::StoreError;
use qlog_normalize::NormalizeError;
use qlog_processor::Disposition;
use qlog_processor::ProcessError;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Skeleton of the paid fixture query.
const FIELD_SKELETON: &str = "query($_0:Int$_1:Int){field(arg:$_0 other:$_1)}";

// ============================================================================
// SECTION: Persistence
// ============================================================================

/// A paid query lands as one skeleton plus one log row with its values.
#[test]
fn paid_query_persists_skeleton_and_log_row() {
    let harness = Harness::with_field_schema();
    let message =
        paid_query("query Foo($a:Int){field(arg:1,other:$a)}", &json!({"a": 5}), "1000");

    let outcome = harness.processor.process(&message).unwrap();

    assert_eq!(outcome.dataset, dataset());
    assert_eq!(outcome.row_ids.len(), 1);
    assert_eq!(outcome.fees, 1000);
    let hash = SkeletonHash::of_text(FIELD_SKELETON);
    assert_eq!(harness.store.skeleton_text(&hash).unwrap().as_deref(), Some(FIELD_SKELETON));
    let rows = harness.store.logs_for_hash(&hash).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, outcome.row_ids[0]);
    assert_eq!(rows[0].dataset, dataset());
    assert_eq!(rows[0].timestamp_ms, 1_700_000_000_000);
    assert_eq!(rows[0].response_time_ms, Some(42));
    assert_eq!(rows[0].variables, Some(json!([1, 5])));
    assert_eq!(harness.fees.total(&dataset()), 1000);
}

/// Queries that differ only in values share a skeleton row.
#[test]
fn equivalent_queries_share_one_skeleton() {
    let harness = Harness::with_field_schema();
    let first = paid_query("query Foo($a:Int){field(arg:1,other:$a)}", &json!({"a": 5}), "10");
    let second = paid_query("{ field(other: 7, arg: 2) }", &json!({}), "20");

    harness.processor.process(&first).unwrap();
    harness.processor.process(&second).unwrap();

    assert_eq!(harness.store.skeleton_count().unwrap(), 1);
    assert_eq!(harness.store.log_count().unwrap(), 2);
    let rows = harness.store.logs_for_hash(&SkeletonHash::of_text(FIELD_SKELETON)).unwrap();
    let values: Vec<_> = rows.iter().map(|row| row.variables.clone()).collect();
    assert_eq!(values, vec![Some(json!([1, 5])), Some(json!([2, 7]))]);
    assert_eq!(harness.fees.total(&dataset()), 30);
}

/// Batched roots split into rows without a response time; the fee counts once.
#[test]
fn batched_record_splits_rows_and_counts_fee_once() {
    let harness = Harness::with_field_schema();
    let message = paid_query("{ a: field(arg: 1) b: field(arg: 2) }", &json!({}), "500");

    let outcome = harness.processor.process(&message).unwrap();

    assert_eq!(outcome.row_ids.len(), 2);
    assert_eq!(harness.store.log_count().unwrap(), 2);
    for skeleton in ["query($_0:Int){a:field(arg:$_0)}", "query($_0:Int){b:field(arg:$_0)}"] {
        let rows = harness.store.logs_for_hash(&SkeletonHash::of_text(skeleton)).unwrap();
        assert_eq!(rows.len(), 1, "{skeleton}");
        assert_eq!(rows[0].response_time_ms, None);
    }
    assert_eq!(harness.fees.total(&dataset()), 500);
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Malformed transport payloads are discarded without side effects.
#[test]
fn malformed_message_is_discarded() {
    let harness = Harness::with_field_schema();

    let err = harness.processor.process(b"not json").unwrap_err();

    assert!(matches!(err, ProcessError::Decode(_)));
    assert_eq!(err.disposition(), Disposition::Discard);
    assert_eq!(err.kind(), "decode");
    assert_eq!(harness.store.log_count().unwrap(), 0);
}

/// Datasets without a schema are discarded.
#[test]
fn unknown_schema_is_discarded() {
    let harness = Harness::new(Arc::new(FixedSchemas::Missing));
    let message = paid_query("{ field(arg: 1) }", &json!({}), "1000");

    let err = harness.processor.process(&message).unwrap_err();

    assert_eq!(err.kind(), "schema_unavailable");
    assert_eq!(err.disposition(), Disposition::Discard);
    assert_eq!(harness.store.skeleton_count().unwrap(), 0);
    assert_eq!(harness.fees.total(&dataset()), 0);
}

/// Schema transport failures are discarded.
#[test]
fn schema_transport_failure_is_discarded() {
    let harness = Harness::new(Arc::new(FixedSchemas::Unreachable));
    let message = paid_query("{ field(arg: 1) }", &json!({}), "1000");

    let err = harness.processor.process(&message).unwrap_err();

    assert!(matches!(err, ProcessError::SchemaFetch { .. }));
    assert_eq!(err.kind(), "schema_transport");
    assert_eq!(err.disposition(), Disposition::Discard);
}

/// Unparseable queries are discarded.
#[test]
fn unparseable_query_is_discarded() {
    let harness = Harness::with_field_schema();
    let message = paid_query("{ field(arg: ", &json!({}), "1000");

    let err = harness.processor.process(&message).unwrap_err();

    assert_eq!(err.kind(), "parse");
    assert_eq!(err.disposition(), Disposition::Discard);
}

/// Queries whose fragments expand past the selection budget are discarded.
#[test]
fn runaway_fragment_expansion_is_discarded() {
    let harness = Harness::with_field_schema();
    let mut query = String::from("{ ...F0 } ");
    for level in 0 .. 24 {
        let next = level + 1;
        query.push_str(&format!(
            "fragment F{level} on Query {{ ... @include(if: true) {{ ...F{next} }} \
             ... @skip(if: false) {{ ...F{next} }} }} "
        ));
    }
    query.push_str("fragment F24 on Query { field(arg: 1) }");
    let message = paid_query(&query, &json!({}), "1000");

    let err = harness.processor.process(&message).unwrap_err();

    assert!(matches!(err, ProcessError::Normalize {
        source: NormalizeError::ExpansionLimit(_),
        ..
    }));
    assert_eq!(err.kind(), "parse");
    assert_eq!(err.disposition(), Disposition::Discard);
    assert_eq!(harness.fees.total(&dataset()), 0);
}

/// Store integrity failures are fatal and count no fee.
#[test]
fn store_integrity_failure_is_fatal() {
    let (processor, fees) =
        rejecting_processor(StoreError::Integrity("hash collision".to_string()));
    let message = paid_query("{ field(arg: 1) }", &json!({}), "1000");

    let err = processor.process(&message).unwrap_err();

    assert_eq!(err.kind(), "store_integrity");
    assert_eq!(err.disposition(), Disposition::Fatal);
    assert_eq!(fees.total(&dataset()), 0);
}

/// Other store failures are discarded.
#[test]
fn store_backend_failure_is_discarded() {
    let (processor, fees) = rejecting_processor(StoreError::Db("disk I/O error".to_string()));
    let message = paid_query("{ field(arg: 1) }", &json!({}), "1000");

    let err = processor.process(&message).unwrap_err();

    assert_eq!(err.kind(), "store");
    assert_eq!(err.disposition(), Disposition::Discard);
    assert_eq!(fees.total(&dataset()), 0);
}
