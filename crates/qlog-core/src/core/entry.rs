// crates/qlog-core/src/core/entry.rs
// ============================================================================
// Module: Normalized Entries
// Description: Pipeline output and the log entries derived from it.
// Purpose: Carry skeletons and extracted values from normalization to storage.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! A raw record normalizes into one [`NormalizedQuery`] per root query. Each
//! becomes one [`LogEntry`]; response time and fee are attributed only when
//! the record produced exactly one entry.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::core::hashing::SkeletonHash;
use crate::core::identifiers::DatasetId;
use crate::core::record::ExecutionRecord;

// ============================================================================
// SECTION: Normalized Query
// ============================================================================

/// Canonical skeleton text paired with the values removed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedQuery {
    /// Minified canonical query text.
    pub skeleton: String,
    /// Removed values, in placeholder order.
    pub variables: Vec<Value>,
}

// ============================================================================
// SECTION: Log Entry
// ============================================================================

/// One execution log row ready for the fingerprint store.
///
/// # Invariants
/// - `skeleton_hash` is the digest of `skeleton`.
/// - `response_time_ms` and `fees` are `None` for records that split into more
///   than one root query.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    /// Dataset the query ran against.
    pub dataset: DatasetId,
    /// Canonical skeleton text.
    pub skeleton: String,
    /// Digest of `skeleton`.
    pub skeleton_hash: SkeletonHash,
    /// Wall-clock time of execution in unix milliseconds.
    pub timestamp_ms: i64,
    /// Response time, when attributable.
    pub response_time_ms: Option<i64>,
    /// Extracted values, `None` when nothing was extracted.
    pub variables: Option<Vec<Value>>,
    /// Fee amount, when attributable. Not persisted.
    pub fees: Option<u128>,
}

impl LogEntry {
    /// Builds the log entries for one record from its normalized queries.
    #[must_use]
    pub fn from_record(record: &ExecutionRecord, normalized: Vec<NormalizedQuery>) -> Vec<Self> {
        let single = normalized.len() == 1;
        normalized
            .into_iter()
            .map(|query| Self {
                dataset: record.dataset.clone(),
                skeleton_hash: SkeletonHash::of_text(&query.skeleton),
                skeleton: query.skeleton,
                timestamp_ms: record.timestamp_ms,
                response_time_ms: single.then_some(record.response_time_ms),
                variables: (!query.variables.is_empty()).then_some(query.variables),
                fees: single.then_some(record.fees),
            })
            .collect()
    }
}
