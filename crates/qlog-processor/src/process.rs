// crates/qlog-processor/src/process.rs
// ============================================================================
// Module: Record Processing
// Description: One transport message through decode, normalize and store.
// Purpose: Classify every per-record failure as discard or fatal.
// Dependencies: qlog-core, qlog-normalize, thiserror, tracing
// ============================================================================

//! ## Overview
//! Processing a message is a straight pipeline: decode the record, resolve
//! the dataset schema, canonicalize the query, persist every resulting entry
//! in one unit of work, then add the record's fee to the dataset counter.
//! Any stage may fail; [`ProcessError::disposition`] tells the ingestion loop
//! whether to drop the record or stop.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use qlog_core::DatasetId;
use qlog_core::DecodeError;
use qlog_core::ExecutionRecord;
use qlog_core::FeeMetrics;
use qlog_core::FingerprintStore;
use qlog_core::LogEntry;
use qlog_core::LogRowId;
use qlog_core::SchemaFetchError;
use qlog_core::SchemaResolver;
use qlog_core::StoreError;
use qlog_normalize::NormalizeError;
use qlog_normalize::normalize_query;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// What the ingestion loop does with a failed record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Log the failure and continue with the next record.
    Discard,
    /// Log the failure and stop the process.
    Fatal,
}

/// Per-record processing failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessError {
    /// The transport payload is malformed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The schema endpoint could not be reached within the retry budget.
    #[error("schema fetch failed for {dataset}: {source}")]
    SchemaFetch {
        /// Dataset whose schema was requested.
        dataset: DatasetId,
        /// Underlying fetch failure.
        source: SchemaFetchError,
    },
    /// The query could not be canonicalized.
    #[error("normalization failed for {dataset}: {source}")]
    Normalize {
        /// Dataset the query ran against.
        dataset: DatasetId,
        /// Underlying pipeline failure.
        source: NormalizeError,
    },
    /// The fingerprint store rejected the writes.
    #[error("store write failed for {dataset}: {source}")]
    Store {
        /// Dataset the query ran against.
        dataset: DatasetId,
        /// Underlying store failure.
        source: StoreError,
    },
}

impl ProcessError {
    /// Returns how the ingestion loop must treat this failure.
    ///
    /// Only store integrity failures are fatal; they mean a store invariant
    /// is broken and continuing would hide it.
    #[must_use]
    pub const fn disposition(&self) -> Disposition {
        match self {
            Self::Store {
                source: StoreError::Integrity(_),
                ..
            } => Disposition::Fatal,
            _ => Disposition::Discard,
        }
    }

    /// Returns a stable label for the failure kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Decode(_) => "decode",
            Self::SchemaFetch {
                ..
            } => "schema_transport",
            Self::Normalize {
                source: NormalizeError::SchemaUnavailable,
                ..
            } => "schema_unavailable",
            Self::Normalize {
                ..
            } => "parse",
            Self::Store {
                source: StoreError::Integrity(_),
                ..
            } => "store_integrity",
            Self::Store {
                ..
            } => "store",
        }
    }
}

// ============================================================================
// SECTION: Processor
// ============================================================================

/// Result of one successfully processed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Dataset the query ran against.
    pub dataset: DatasetId,
    /// Identifiers of the written log rows, one per root query.
    pub row_ids: Vec<LogRowId>,
    /// Fee amount added to the dataset counter.
    pub fees: u128,
}

/// Runs transport messages through the full per-record pipeline.
///
/// # Invariants
/// - The fee counter is touched only after the store commit succeeds, once
///   per record regardless of how many root queries it split into.
#[derive(Clone)]
pub struct RecordProcessor {
    /// Dataset schema resolver.
    schemas: Arc<dyn SchemaResolver>,
    /// Fingerprint store.
    store: Arc<dyn FingerprintStore>,
    /// Fee counter sink.
    fees: Arc<dyn FeeMetrics>,
}

impl RecordProcessor {
    /// Creates a processor over its collaborators.
    #[must_use]
    pub fn new(
        schemas: Arc<dyn SchemaResolver>,
        store: Arc<dyn FingerprintStore>,
        fees: Arc<dyn FeeMetrics>,
    ) -> Self {
        Self {
            schemas,
            store,
            fees,
        }
    }

    /// Processes one raw transport message.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessError`] when any stage fails; nothing is persisted and
    /// no fee is counted then.
    pub fn process(&self, body: &[u8]) -> Result<ProcessOutcome, ProcessError> {
        let record = ExecutionRecord::decode(body)?;
        let dataset = record.dataset.clone();
        let schema = self.schemas.resolve(&dataset).map_err(|source| ProcessError::SchemaFetch {
            dataset: dataset.clone(),
            source,
        })?;
        let normalized = normalize_query(&record.query, &record.variables, schema.as_deref())
            .map_err(|source| ProcessError::Normalize {
                dataset: dataset.clone(),
                source,
            })?;
        let entries = LogEntry::from_record(&record, normalized);
        for entry in &entries {
            debug!(dataset = %dataset, hash = %entry.skeleton_hash, "normalized root query");
        }
        let row_ids = self.store.record_execution(&entries).map_err(|source| ProcessError::Store {
            dataset: dataset.clone(),
            source,
        })?;
        self.fees.record_fees(&dataset, record.fees);
        Ok(ProcessOutcome {
            dataset,
            row_ids,
            fees: record.fees,
        })
    }
}
