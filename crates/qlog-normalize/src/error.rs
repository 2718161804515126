// crates/qlog-normalize/src/error.rs
// ============================================================================
// Module: Normalization Errors
// Description: Failure kinds of the canonicalization pipeline.
// Purpose: Let callers discard a record with a precise reason.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every normalization failure is per-record: the caller logs it and moves on.
//! Messages name the offending construct but never embed the full query text.

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Canonicalization pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// Query text is not a valid executable document.
    #[error("invalid query: {0}")]
    Parse(String),
    /// The dataset has no usable schema.
    #[error("schema unavailable for dataset")]
    SchemaUnavailable,
    /// Variable bindings are not a mapping.
    #[error("invalid variable bindings: {0}")]
    Variables(String),
    /// A fragment spread names an undefined fragment.
    #[error("unknown fragment: {0}")]
    UnknownFragment(String),
    /// Fragment spreads form a cycle.
    #[error("fragment cycle through: {0}")]
    FragmentCycle(String),
    /// Fragment expansion exceeds the selection budget.
    #[error("fragment expansion exceeds {0} selections")]
    ExpansionLimit(usize),
}
