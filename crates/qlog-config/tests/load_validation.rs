// crates/qlog-config/tests/load_validation.rs
// ============================================================================
// Module: Config Load Validation Tests
// Description: Loading, defaults and fail-closed validation of qlog.toml.
// Purpose: Ensure invalid configuration is rejected before any component starts.
// Dependencies: qlog-config, tempfile
// ============================================================================

//! ## Overview
//! Covers file loading limits, section defaults, conversion into component
//! configuration, and each validation rule.

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

use std::fs;
use std::path::Path;
use std::time::Duration;

use qlog_config::ConfigError;
use qlog_config::MAX_CONFIG_FILE_SIZE;
use qlog_config::QlogConfig;
use qlog_config::config_toml_example;
use qlog_config::resolve_path;
use qlog_store_sqlite::SqliteStoreMode;
use tempfile::TempDir;

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Minimal valid configuration.
const MINIMAL: &str = "[schema_source]\nendpoint = \"http://localhost:8000\"\n";

/// Parses configuration text, expecting an invalid-config error.
fn assert_invalid(content: &str) {
    let err = QlogConfig::from_toml_str(content).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "unexpected error: {err}");
}

// ============================================================================
// SECTION: Loading
// ============================================================================

/// A file on disk loads and validates.
#[test]
fn load_reads_explicit_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("qlog.toml");
    fs::write(&path, MINIMAL).unwrap();
    let config = QlogConfig::load(Some(&path)).unwrap();
    assert_eq!(config.schema_source.endpoint, "http://localhost:8000");
}

/// A missing file is an I/O error.
#[test]
fn load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = QlogConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

/// Oversized files are rejected before parsing.
#[test]
fn load_rejects_oversized_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("qlog.toml");
    let mut content = MINIMAL.to_string();
    content.push_str(&"#".repeat(MAX_CONFIG_FILE_SIZE));
    fs::write(&path, content).unwrap();
    let err = QlogConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

/// Non-UTF-8 files are rejected.
#[test]
fn load_rejects_non_utf8() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("qlog.toml");
    fs::write(&path, [0xff_u8, 0xfe, 0x00]).unwrap();
    let err = QlogConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

/// An explicit path wins over every default.
#[test]
fn explicit_path_is_resolved_verbatim() {
    let resolved = resolve_path(Some(Path::new("custom/qlog.toml"))).unwrap();
    assert_eq!(resolved, Path::new("custom/qlog.toml"));
}

/// Malformed TOML is a parse error.
#[test]
fn malformed_toml_is_parse_error() {
    let err = QlogConfig::from_toml_str("[schema_source\nendpoint = 1").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

/// The schema source section is required.
#[test]
fn missing_schema_source_is_parse_error() {
    let err = QlogConfig::from_toml_str("[logging]\nlevel = \"info\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Omitted sections take their documented defaults.
#[test]
fn defaults_are_applied() {
    let config = QlogConfig::from_toml_str(MINIMAL).unwrap();
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.schema_source.timeout_ms, 5_000);
    assert_eq!(config.schema_source.retry_budget_ms, 30_000);
    assert_eq!(config.ingest.queue_capacity, 1_000);
    assert_eq!(config.ingest.input_path(), None);
    assert_eq!(config.ingest.poll_interval(), Duration::from_millis(250));
    assert!(config.metrics.enabled);
    assert_eq!(config.metrics.bind_addr().unwrap().port(), 8000);
    assert_eq!(config.store.journal_mode, SqliteStoreMode::Wal);
    assert_eq!(config.discovery.networks, vec!["mainnet", "arbitrum-one"]);
    assert!(!config.discovery.is_active());
}

/// The canonical example passes validation.
#[test]
fn example_config_is_valid() {
    let config = QlogConfig::from_toml_str(&config_toml_example()).unwrap();
    assert_eq!(config.discovery.indexed.len(), 1);
}

// ============================================================================
// SECTION: Conversion
// ============================================================================

/// The schema source section converts into the source configuration.
#[test]
fn schema_source_converts_to_source_config() {
    let config = QlogConfig::from_toml_str(
        "[schema_source]\nendpoint = \"https://graph.example.com/\"\ninitial_backoff_ms = \
         50\nmax_backoff_ms = 400\nretry_budget_ms = 2000\n",
    )
    .unwrap();
    let source = config.schema_source.source_config().unwrap();
    assert_eq!(source.endpoint.as_str(), "https://graph.example.com/");
    assert_eq!(source.backoff.initial, Duration::from_millis(50));
    assert_eq!(source.backoff.max, Duration::from_millis(400));
    assert_eq!(source.backoff.budget, Duration::from_secs(2));
}

/// The store section converts into the `SQLite` configuration.
#[test]
fn store_converts_to_sqlite_config() {
    let config = QlogConfig::from_toml_str(&format!(
        "{MINIMAL}[store]\npath = \"data/q.db\"\njournal_mode = \"delete\"\n"
    ))
    .unwrap();
    let sqlite = config.store.sqlite_config();
    assert_eq!(sqlite.path, Path::new("data/q.db"));
    assert_eq!(sqlite.journal_mode, SqliteStoreMode::Delete);
}

/// The indexer agent is configured only when an endpoint is given.
#[test]
fn indexer_agent_config_follows_endpoint() {
    let plain = QlogConfig::from_toml_str(MINIMAL).unwrap();
    assert!(plain.discovery.indexer_agent(plain.schema_source.backoff()).unwrap().is_none());

    let agent = QlogConfig::from_toml_str(&format!(
        "{MINIMAL}[discovery]\nindexer_agent_endpoint = \"http://agent:18000\"\nnetworks = \
         [\"mainnet\"]\n"
    ))
    .unwrap();
    let config = agent.discovery.indexer_agent(agent.schema_source.backoff()).unwrap().unwrap();
    assert_eq!(config.networks, vec!["mainnet".to_string()]);
    assert_eq!(config.endpoint.as_str(), "http://agent:18000/");
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Endpoints must be http or https URLs.
#[test]
fn endpoint_must_be_http() {
    assert_invalid("[schema_source]\nendpoint = \"ftp://example.com\"\n");
    assert_invalid("[schema_source]\nendpoint = \"not a url\"\n");
}

/// The first retry delay may not exceed the cap.
#[test]
fn backoff_bounds_are_ordered() {
    assert_invalid(
        "[schema_source]\nendpoint = \"http://localhost\"\ninitial_backoff_ms = 10\nmax_backoff_ms \
         = 5\n",
    );
}

/// Queue capacity and poll interval must be positive.
#[test]
fn ingest_limits_must_be_positive() {
    assert_invalid(&format!("{MINIMAL}[ingest]\nqueue_capacity = 0\n"));
    assert_invalid(&format!("{MINIMAL}[ingest]\npoll_interval_ms = 0\n"));
}

/// The metrics bind address must parse when metrics are enabled.
#[test]
fn metrics_bind_must_parse_when_enabled() {
    assert_invalid(&format!("{MINIMAL}[metrics]\nbind = \"localhost\"\n"));
    QlogConfig::from_toml_str(&format!("{MINIMAL}[metrics]\nenabled = false\nbind = \"localhost\"\n"))
        .unwrap();
}

/// Malformed dataset identifiers are rejected while parsing.
#[test]
fn malformed_dataset_ids_are_rejected() {
    let err =
        QlogConfig::from_toml_str(&format!("{MINIMAL}[discovery]\nindexed = [\"Qmshort\"]\n"))
            .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

/// An indexer agent needs at least one network.
#[test]
fn indexer_agent_requires_networks() {
    assert_invalid(&format!(
        "{MINIMAL}[discovery]\nindexer_agent_endpoint = \"http://agent\"\nnetworks = []\n"
    ));
}
