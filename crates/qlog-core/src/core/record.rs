// crates/qlog-core/src/core/record.rs
// ============================================================================
// Module: Execution Records
// Description: Decoding of transport messages into execution records.
// Purpose: Turn one raw queue message into a validated, typed record.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Each transport message is a UTF-8 JSON object describing one completed
//! paid query. The nested `query` field is itself a JSON-encoded string that
//! holds the query text and its variable bindings. Decoding validates the
//! sentinel message, the dataset identifier and the fee amount; anything
//! malformed is a [`DecodeError`] and the record is discarded by the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::DatasetId;
use crate::core::identifiers::IdentifierError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Sentinel `msg` value marking a completed paid-query record.
pub const PAID_QUERY_MESSAGE: &str = "Done executing paid query";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Transport payload decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Message body is not valid UTF-8.
    #[error("message body is not valid utf-8")]
    Utf8,
    /// Message body is not the expected JSON object.
    #[error("malformed message json: {0}")]
    Json(String),
    /// Message is not a completed paid-query record.
    #[error("unexpected message kind: {0}")]
    Sentinel(String),
    /// Dataset identifier is malformed.
    #[error("invalid deployment: {0}")]
    Dataset(#[from] IdentifierError),
    /// Nested query blob is malformed.
    #[error("malformed query blob: {0}")]
    QueryBlob(String),
    /// Fee amount is not a non-negative integer.
    #[error("invalid fees amount: {0}")]
    Fees(String),
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Transport message shape.
#[derive(Debug, Deserialize)]
struct WireRecord {
    /// Message kind sentinel.
    msg: String,
    /// Wall-clock time in unix milliseconds.
    time: i64,
    /// Response time in milliseconds.
    #[serde(rename = "responseTime")]
    response_time: i64,
    /// Dataset identifier.
    deployment: String,
    /// JSON-encoded query blob.
    query: String,
    /// Decimal-encoded fee amount.
    fees: String,
}

/// Nested query blob shape.
#[derive(Debug, Deserialize)]
struct QueryBlob {
    /// Raw query text.
    query: String,
    /// Variable bindings, structured or serialized.
    #[serde(default)]
    variables: Value,
}

// ============================================================================
// SECTION: Execution Record
// ============================================================================

/// One decoded query execution.
///
/// # Invariants
/// - `dataset` is a validated identifier.
/// - `variables` is left exactly as transported (object, string or null); the
///   canonicalization pipeline decodes it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    /// Wall-clock time of execution in unix milliseconds.
    pub timestamp_ms: i64,
    /// Response time in milliseconds.
    pub response_time_ms: i64,
    /// Dataset the query ran against.
    pub dataset: DatasetId,
    /// Raw query text.
    pub query: String,
    /// Raw variable bindings.
    pub variables: Value,
    /// Fee amount paid for the execution.
    pub fees: u128,
}

impl ExecutionRecord {
    /// Decodes a raw transport message body.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the body is not a well-formed paid-query record.
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(body).map_err(|_| DecodeError::Utf8)?;
        Self::decode_str(text)
    }

    /// Decodes a transport message that is already known to be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the text is not a well-formed paid-query record.
    pub fn decode_str(text: &str) -> Result<Self, DecodeError> {
        let wire: WireRecord =
            serde_json::from_str(text).map_err(|err| DecodeError::Json(err.to_string()))?;
        if wire.msg != PAID_QUERY_MESSAGE {
            return Err(DecodeError::Sentinel(wire.msg));
        }
        let dataset = DatasetId::parse(&wire.deployment)?;
        let blob: QueryBlob = serde_json::from_str(&wire.query)
            .map_err(|err| DecodeError::QueryBlob(err.to_string()))?;
        let fees = wire.fees.trim().parse::<u128>().map_err(|_| DecodeError::Fees(wire.fees))?;
        Ok(Self {
            timestamp_ms: wire.time,
            response_time_ms: wire.response_time,
            dataset,
            query: blob.query,
            variables: blob.variables,
            fees,
        })
    }
}
