// crates/qlog-store-sqlite/tests/sqlite_store.rs
// ============================================================================
// Module: SQLite Fingerprint Store Tests
// Description: Skeleton idempotence, log integrity and atomic execution writes.
// Purpose: Validate the write-once skeleton and append-only log invariants.
// Dependencies: qlog-store-sqlite, qlog-core, rusqlite, tempfile, proptest
// ============================================================================

//! ## Overview
//! Each test opens a fresh database in a temporary directory and checks the
//! persisted rows through the store's read helpers or a raw connection.

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

use std::path::Path;

use proptest::prelude::*;
use qlog_core::DatasetId;
use qlog_core::FingerprintStore;
use qlog_core::LogEntry;
use qlog_core::SkeletonHash;
use qlog_core::StoreError;
use qlog_store_sqlite::SqliteQueryLogStore;
use qlog_store_sqlite::SqliteStoreConfig;
use qlog_store_sqlite::SqliteStoreError;
use qlog_store_sqlite::SqliteStoreMode;
use qlog_store_sqlite::SqliteSyncMode;
use rusqlite::Connection;
use rusqlite::params;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Fixture dataset identifier.
const DATASET: &str = "QmaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaA";

/// Opens a store at `store.db` under a directory.
fn open_store(dir: &Path) -> SqliteQueryLogStore {
    SqliteQueryLogStore::new(SqliteStoreConfig::new(dir.join("store.db"))).unwrap()
}

/// Builds a log entry for a skeleton.
fn entry(skeleton: &str, response_time_ms: Option<i64>, variables: Option<Vec<serde_json::Value>>) -> LogEntry {
    LogEntry {
        dataset: DatasetId::parse(DATASET).unwrap(),
        skeleton: skeleton.to_string(),
        skeleton_hash: SkeletonHash::of_text(skeleton),
        timestamp_ms: 1_700_000_000_000,
        response_time_ms,
        variables,
        fees: None,
    }
}

// ============================================================================
// SECTION: Skeletons
// ============================================================================

/// Recording the same skeleton twice keeps exactly one row.
#[test]
fn skeleton_insert_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let first = store.record_skeleton("{field}").unwrap();
    let second = store.record_skeleton("{field}").unwrap();
    assert_eq!(first, second);
    assert_eq!(first, SkeletonHash::of_text("{field}"));
    assert_eq!(store.skeleton_count().unwrap(), 1);
    assert_eq!(store.skeleton_text(&first).unwrap().as_deref(), Some("{field}"));
}

/// A hash that already names different text is an integrity failure.
#[test]
fn skeleton_collision_is_integrity_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    let store = SqliteQueryLogStore::new(SqliteStoreConfig::new(&path)).unwrap();
    let hash = store.record_skeleton("{field}").unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute(
        "UPDATE query_skeletons SET query = ?1 WHERE hash = ?2",
        params!["{other}", hash.as_bytes().as_slice()],
    )
    .unwrap();
    drop(raw);

    let err = store.record_skeleton("{field}").unwrap_err();
    assert!(matches!(err, StoreError::Integrity(_)));
    assert_eq!(store.skeleton_text(&hash).unwrap().as_deref(), Some("{other}"));
}

/// Unknown hashes read back as absent.
#[test]
fn unknown_skeleton_reads_as_none() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    assert_eq!(store.skeleton_text(&SkeletonHash::of_text("{missing}")).unwrap(), None);
}

// ============================================================================
// SECTION: Logs
// ============================================================================

/// A log row referencing a missing skeleton is rejected as an integrity failure.
#[test]
fn log_without_skeleton_is_integrity_failure() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let err = store.append_log(&entry("{field}", Some(42), None)).unwrap_err();
    assert!(matches!(err, StoreError::Integrity(_)));
    assert_eq!(store.log_count().unwrap(), 0);
}

/// Log rows persist their attributes and variables.
#[test]
fn log_rows_round_trip_through_read_helpers() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let skeleton = "query($_0:Int){field(arg:$_0)}";
    let hash = store.record_skeleton(skeleton).unwrap();
    let id = store.append_log(&entry(skeleton, Some(42), Some(vec![json!(1)]))).unwrap();
    store.append_log(&entry(skeleton, None, None)).unwrap();

    let rows = store.logs_for_hash(&hash).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|row| row.id == id));
    let with_time = rows.iter().find(|row| row.id == id).unwrap();
    assert_eq!(with_time.response_time_ms, Some(42));
    assert_eq!(with_time.variables, Some(json!([1])));
    assert_eq!(with_time.dataset.as_str(), DATASET);
    assert_eq!(with_time.timestamp_ms, 1_700_000_000_000);
    let without = rows.iter().find(|row| row.id != id).unwrap();
    assert_eq!(without.response_time_ms, None);
    assert_eq!(without.variables, None);
}

/// An entry whose hash does not match its text is rejected.
#[test]
fn mismatched_entry_hash_is_invalid() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    store.record_skeleton("{field}").unwrap();
    let mut bad = entry("{field}", None, None);
    bad.skeleton_hash = SkeletonHash::of_text("{other}");
    let err = store.append_log(&bad).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

// ============================================================================
// SECTION: Executions
// ============================================================================

/// Two records with the same structure share one skeleton row.
#[test]
fn identical_skeletons_share_one_row() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let skeleton = "query($_0:Int$_1:Int){field(arg:$_0 other:$_1)}";
    store.record_execution(&[entry(skeleton, Some(42), Some(vec![json!(1), json!(5)]))]).unwrap();
    store.record_execution(&[entry(skeleton, Some(7), Some(vec![json!(2), json!(9)]))]).unwrap();
    assert_eq!(store.skeleton_count().unwrap(), 1);
    assert_eq!(store.log_count().unwrap(), 2);
    assert_eq!(store.logs_for_hash(&SkeletonHash::of_text(skeleton)).unwrap().len(), 2);
}

/// A batched record writes one log row per root query.
#[test]
fn execution_writes_every_entry() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let ids = store
        .record_execution(&[entry("{a}", None, None), entry("{b}", None, None)])
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(store.skeleton_count().unwrap(), 2);
    assert_eq!(store.log_count().unwrap(), 2);
}

/// A failing entry rolls back every write of the execution.
#[test]
fn failed_execution_commits_nothing() {
    let dir = TempDir::new().unwrap();
    let store = open_store(dir.path());
    let mut bad = entry("{b}", None, None);
    bad.skeleton_hash = SkeletonHash::of_text("{c}");
    let err = store.record_execution(&[entry("{a}", None, None), bad]).unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
    assert_eq!(store.skeleton_count().unwrap(), 0);
    assert_eq!(store.log_count().unwrap(), 0);
}

// ============================================================================
// SECTION: Lifecycle
// ============================================================================

/// Rows survive reopening the database.
#[test]
fn rows_persist_across_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = open_store(dir.path());
        store.record_execution(&[entry("{field}", Some(1), None)]).unwrap();
    }
    let store = open_store(dir.path());
    store.readiness().unwrap();
    assert_eq!(store.skeleton_count().unwrap(), 1);
    assert_eq!(store.log_count().unwrap(), 1);
}

/// Missing parent directories are created.
#[test]
fn parent_directories_are_created() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("store.db");
    let config = SqliteStoreConfig {
        path: path.clone(),
        busy_timeout_ms: 1_000,
        journal_mode: SqliteStoreMode::Delete,
        sync_mode: SqliteSyncMode::Normal,
    };
    SqliteQueryLogStore::new(config).unwrap();
    assert!(path.exists());
}

/// A directory path is rejected.
#[test]
fn directory_path_is_rejected() {
    let dir = TempDir::new().unwrap();
    let err = SqliteQueryLogStore::new(SqliteStoreConfig::new(dir.path())).err().unwrap();
    assert!(matches!(err, SqliteStoreError::Invalid(_)));
}

/// An unknown schema version is refused.
#[test]
fn unsupported_schema_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("store.db");
    drop(SqliteQueryLogStore::new(SqliteStoreConfig::new(&path)).unwrap());
    let raw = Connection::open(&path).unwrap();
    raw.execute("UPDATE store_meta SET version = 99", []).unwrap();
    drop(raw);
    let err = SqliteQueryLogStore::new(SqliteStoreConfig::new(&path)).err().unwrap();
    assert!(matches!(err, SqliteStoreError::VersionMismatch(_)));
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Any skeleton text recorded twice keeps one row and reads back unchanged.
    #[test]
    fn recorded_skeletons_read_back(text in "[{}a-z_$:() ]{1,40}") {
        let dir = TempDir::new().unwrap();
        let store = open_store(dir.path());
        let first = store.record_skeleton(&text).unwrap();
        let second = store.record_skeleton(&text).unwrap();
        prop_assert_eq!(first, second);
        prop_assert_eq!(store.skeleton_count().unwrap(), 1);
        prop_assert_eq!(store.skeleton_text(&first).unwrap(), Some(text));
    }
}
