// crates/qlog-core/src/core/identifiers.rs
// ============================================================================
// Module: Query Log Identifiers
// Description: Dataset identifiers and log row identifiers.
// Purpose: Provide strongly typed identifiers with validated wire forms.
// Dependencies: serde, thiserror, uuid
// ============================================================================

//! ## Overview
//! Dataset identifiers are fixed-length content identifiers naming one
//! queryable deployment. They are validated once when a record is decoded and
//! carried as an opaque string afterwards. Log row identifiers are random
//! UUIDs generated at insert time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exact length of a dataset identifier in bytes.
pub const DATASET_ID_LENGTH: usize = 46;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Identifier validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    /// Identifier has the wrong length.
    #[error("dataset id must be {DATASET_ID_LENGTH} characters, got {0}")]
    Length(usize),
    /// Identifier contains a character outside the allowed alphabet.
    #[error("dataset id contains a non-alphanumeric character")]
    Alphabet,
}

// ============================================================================
// SECTION: Dataset Identifier
// ============================================================================

/// Identifier of a single queryable dataset deployment.
///
/// # Invariants
/// - Exactly [`DATASET_ID_LENGTH`] ASCII alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DatasetId(String);

impl DatasetId {
    /// Parses and validates a dataset identifier.
    ///
    /// # Errors
    ///
    /// Returns [`IdentifierError`] when the value is not a well-formed identifier.
    pub fn parse(value: &str) -> Result<Self, IdentifierError> {
        if value.len() != DATASET_ID_LENGTH {
            return Err(IdentifierError::Length(value.len()));
        }
        if !value.bytes().all(|byte| byte.is_ascii_alphanumeric()) {
            return Err(IdentifierError::Alphabet);
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DatasetId {
    type Err = IdentifierError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl<'de> Deserialize<'de> for DatasetId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SECTION: Log Row Identifier
// ============================================================================

/// Generated identifier of one execution log row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogRowId(Uuid);

impl LogRowId {
    /// Generates a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for LogRowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
