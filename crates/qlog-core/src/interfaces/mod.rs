// crates/qlog-core/src/interfaces/mod.rs
// ============================================================================
// Module: Query Log Interfaces
// Description: Collaborator interfaces for schemas, storage and metrics.
// Purpose: Define the contract surfaces the ingestion loop is built on.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! Interfaces keep the ingestion loop independent of any concrete schema
//! endpoint, database or metrics exporter. Implementations report failures
//! through typed errors so the loop can decide between discarding a record
//! and stopping the process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;

use crate::core::entry::LogEntry;
use crate::core::hashing::SkeletonHash;
use crate::core::identifiers::DatasetId;
use crate::core::identifiers::LogRowId;
use crate::core::schema::Schema;

// ============================================================================
// SECTION: Schema Source
// ============================================================================

/// Schema retrieval errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaFetchError {
    /// The schema endpoint could not be reached.
    #[error("schema transport failure: {0}")]
    Transport(String),
    /// The dataset answered with a query-level error.
    #[error("schema query failure: {0}")]
    Query(String),
    /// The dataset answered with a malformed introspection result.
    #[error("invalid introspection result: {0}")]
    Invalid(String),
}

impl SchemaFetchError {
    /// Returns true when the failure is a definitive answer from the dataset.
    ///
    /// Definitive failures are cached as a missing schema; transport failures
    /// are not.
    #[must_use]
    pub const fn is_definitive(&self) -> bool {
        matches!(self, Self::Query(_) | Self::Invalid(_))
    }
}

/// Performs one introspection of a dataset.
pub trait SchemaSource: Send + Sync {
    /// Fetches the schema of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaFetchError`] when the schema cannot be fetched.
    fn fetch_schema(&self, dataset: &DatasetId) -> Result<Schema, SchemaFetchError>;
}

/// Resolves a dataset to its schema, if it has one.
pub trait SchemaResolver: Send + Sync {
    /// Resolves a dataset schema; `Ok(None)` means the dataset has no usable schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaFetchError`] on transport failures.
    fn resolve(&self, dataset: &DatasetId) -> Result<Option<Arc<Schema>>, SchemaFetchError>;
}

// ============================================================================
// SECTION: Dataset Discovery
// ============================================================================

/// Dataset discovery errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The discovery backend could not be queried.
    #[error("dataset discovery failed: {0}")]
    Unavailable(String),
}

/// Read-only snapshots of which datasets exist and which are served.
pub trait DatasetDiscovery: Send + Sync {
    /// Returns the datasets currently indexed.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the snapshot cannot be taken.
    fn indexed_datasets(&self) -> Result<BTreeSet<DatasetId>, DiscoveryError>;

    /// Returns the datasets currently allocated for serving.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the snapshot cannot be taken.
    fn allocated_datasets(&self) -> Result<BTreeSet<DatasetId>, DiscoveryError>;
}

// ============================================================================
// SECTION: Fingerprint Store
// ============================================================================

/// Fingerprint store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// Store backend error.
    #[error("store backend error: {0}")]
    Db(String),
    /// Invalid data passed to or read from the store.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// A store invariant is broken (hash collision, dangling reference).
    #[error("store integrity failure: {0}")]
    Integrity(String),
}

/// Content-addressed skeleton table plus append-only execution log.
pub trait FingerprintStore: Send + Sync {
    /// Inserts a skeleton if absent and returns its hash.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Integrity`] when the hash already names different text.
    fn record_skeleton(&self, skeleton: &str) -> Result<SkeletonHash, StoreError>;

    /// Appends one log row referencing an existing skeleton.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Integrity`] when the referenced skeleton is missing.
    fn append_log(&self, entry: &LogEntry) -> Result<LogRowId, StoreError>;

    /// Records the skeletons and log rows of one raw record as one unit of work.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when any write fails; nothing is committed then.
    fn record_execution(&self, entries: &[LogEntry]) -> Result<Vec<LogRowId>, StoreError>;
}

// ============================================================================
// SECTION: Fee Metrics
// ============================================================================

/// Monotonic per-dataset fee counter.
pub trait FeeMetrics: Send + Sync {
    /// Adds a record's fee amount to the dataset's counter.
    fn record_fees(&self, dataset: &DatasetId, fees: u128);
}

/// No-op fee metrics sink.
pub struct NoopFeeMetrics;

impl FeeMetrics for NoopFeeMetrics {
    fn record_fees(&self, _dataset: &DatasetId, _fees: u128) {}
}
