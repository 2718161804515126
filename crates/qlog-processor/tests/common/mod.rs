// crates/qlog-processor/tests/common/mod.rs
// ============================================================================
// Module: Common Test Fixtures
// Description: Transport messages, fixed schemas and stores for processor tests.
// Purpose: Drive the record pipeline end to end without a network.
// Dependencies: qlog-core, qlog-processor, qlog-store-sqlite, serde_json, tempfile
// ============================================================================

//! ## Overview
//! [`Harness`] wires a [`RecordProcessor`] to a fixed-schema resolver, a
//! temporary `SQLite` store and a [`FeeCounter`]. [`paid_query`] builds the
//! transport message the indexer emits for one paid query.

#![allow(dead_code, reason = "Shared test helpers may be unused in some cases.")]
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unwrap_in_result,
    reason = "Test fixtures favor direct unwraps for setup clarity."
)]

use std::sync::Arc;

use qlog_core::DatasetId;
use qlog_core::FingerprintStore;
use qlog_core::LogEntry;
use qlog_core::LogRowId;
use qlog_core::Schema;
use qlog_core::SchemaFetchError;
use qlog_core::SchemaResolver;
use qlog_core::SkeletonHash;
use qlog_core::StoreError;
use qlog_processor::FeeCounter;
use qlog_processor::RecordProcessor;
use qlog_store_sqlite::SqliteQueryLogStore;
use qlog_store_sqlite::SqliteStoreConfig;
use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;

// ============================================================================
// SECTION: Fixtures
// ============================================================================

/// Dataset every fixture message targets.
pub const DATASET: &str = "QmTXzATwNfgGVukV1fX2T6xw9f6LAYRVWpsdXyRWzUR2H9";

/// Parses the fixture dataset id.
pub fn dataset() -> DatasetId {
    DatasetId::parse(DATASET).unwrap()
}

/// Schema with a single `Query.field(arg: Int, other: Int): Int` root.
pub fn field_schema() -> Schema {
    let int = json!({"kind": "SCALAR", "name": "Int", "ofType": null});
    let introspection = json!({"__schema": {
        "queryType": {"name": "Query"},
        "mutationType": null,
        "subscriptionType": null,
        "types": [
            {"kind": "OBJECT", "name": "Query", "inputFields": null, "fields": [
                {"name": "field", "type": int, "args": [
                    {"name": "arg", "type": int, "defaultValue": null},
                    {"name": "other", "type": int, "defaultValue": null}
                ]}
            ]},
            {"kind": "SCALAR", "name": "Int"}
        ]
    }});
    Schema::from_introspection(&introspection).unwrap()
}

/// Builds a paid-query transport message.
pub fn paid_query(query: &str, variables: &Value, fees: &str) -> Vec<u8> {
    let blob = json!({"query": query, "variables": variables}).to_string();
    serde_json::to_vec(&json!({
        "msg": "Done executing paid query",
        "time": 1_700_000_000_000_i64,
        "responseTime": 42,
        "deployment": DATASET,
        "query": blob,
        "fees": fees,
    }))
    .unwrap()
}

// ============================================================================
// SECTION: Schema Resolvers
// ============================================================================

/// Resolver returning the same answer for every dataset.
pub enum FixedSchemas {
    /// Every dataset resolves to this schema.
    Known(Arc<Schema>),
    /// Every dataset is unknown.
    Missing,
    /// Every lookup fails in transport.
    Unreachable,
}

impl FixedSchemas {
    /// Resolver serving [`field_schema`].
    pub fn field() -> Arc<Self> {
        Arc::new(Self::Known(Arc::new(field_schema())))
    }
}

impl SchemaResolver for FixedSchemas {
    fn resolve(&self, _dataset: &DatasetId) -> Result<Option<Arc<Schema>>, SchemaFetchError> {
        match self {
            Self::Known(schema) => Ok(Some(Arc::clone(schema))),
            Self::Missing => Ok(None),
            Self::Unreachable => Err(SchemaFetchError::Transport("connection refused".to_string())),
        }
    }
}

// ============================================================================
// SECTION: Harness
// ============================================================================

/// Processor wired to a temporary store and an in-memory fee counter.
pub struct Harness {
    /// Processor under test.
    pub processor: RecordProcessor,
    /// Backing store.
    pub store: Arc<SqliteQueryLogStore>,
    /// Fee counter.
    pub fees: Arc<FeeCounter>,
    /// Keeps the database directory alive.
    _dir: TempDir,
}

impl Harness {
    /// Builds a harness over the given resolver.
    pub fn new(schemas: Arc<dyn SchemaResolver>) -> Self {
        let dir = TempDir::new().unwrap();
        let config = SqliteStoreConfig::new(dir.path().join("qlog.db"));
        let store = Arc::new(SqliteQueryLogStore::new(config).unwrap());
        let fees = Arc::new(FeeCounter::new());
        let processor =
            RecordProcessor::new(schemas, Arc::clone(&store) as _, Arc::clone(&fees) as _);
        Self {
            processor,
            store,
            fees,
            _dir: dir,
        }
    }

    /// Builds a harness serving [`field_schema`].
    pub fn with_field_schema() -> Self {
        Self::new(FixedSchemas::field())
    }
}

// ============================================================================
// SECTION: Failing Store
// ============================================================================

/// Store that rejects every write with the configured error.
pub struct RejectingStore(pub StoreError);

impl FingerprintStore for RejectingStore {
    fn record_skeleton(&self, _skeleton: &str) -> Result<SkeletonHash, StoreError> {
        Err(self.0.clone())
    }

    fn append_log(&self, _entry: &LogEntry) -> Result<LogRowId, StoreError> {
        Err(self.0.clone())
    }

    fn record_execution(&self, _entries: &[LogEntry]) -> Result<Vec<LogRowId>, StoreError> {
        Err(self.0.clone())
    }
}

/// Processor over a store that always fails with `error`.
pub fn rejecting_processor(error: StoreError) -> (RecordProcessor, Arc<FeeCounter>) {
    let fees = Arc::new(FeeCounter::new());
    let processor = RecordProcessor::new(
        FixedSchemas::field(),
        Arc::new(RejectingStore(error)),
        Arc::clone(&fees) as _,
    );
    (processor, fees)
}
