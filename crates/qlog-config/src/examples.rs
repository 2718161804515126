// crates/qlog-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for the query log processor configuration. The output
//! is deterministic and must always pass validation.

/// Returns a canonical example `qlog.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[logging]
level = "warn"

[schema_source]
endpoint = "http://127.0.0.1:8000"
timeout_ms = 5000
max_response_bytes = 16777216
retry_budget_ms = 30000
initial_backoff_ms = 100
max_backoff_ms = 5000

[discovery]
indexed = ["QmaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaA"]
# indexer_agent_endpoint = "http://127.0.0.1:18000"
networks = ["mainnet", "arbitrum-one"]
warm_on_start = false
require_indexed = false

[store]
path = "qlog.db"
journal_mode = "wal"
sync_mode = "full"
busy_timeout_ms = 5000

[ingest]
queue_capacity = 1000
poll_interval_ms = 250
input = "-"

[metrics]
enabled = true
bind = "0.0.0.0:8000"
"#,
    )
}
