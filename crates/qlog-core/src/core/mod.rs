// crates/qlog-core/src/core/mod.rs
// ============================================================================
// Module: Query Log Core Types
// Description: Data model shared by every processor component.
// Purpose: Group identifiers, hashing, records, entries and schema types.
// Dependencies: crate::core::*
// ============================================================================

//! ## Overview
//! Core types are plain data: they carry no I/O and validate their invariants
//! at construction boundaries.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod entry;
pub mod hashing;
pub mod identifiers;
pub mod record;
pub mod schema;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use entry::LogEntry;
pub use entry::NormalizedQuery;
pub use hashing::SKELETON_HASH_BYTES;
pub use hashing::SkeletonHash;
pub use identifiers::DATASET_ID_LENGTH;
pub use identifiers::DatasetId;
pub use identifiers::IdentifierError;
pub use identifiers::LogRowId;
pub use record::DecodeError;
pub use record::ExecutionRecord;
pub use record::PAID_QUERY_MESSAGE;
pub use schema::FieldDef;
pub use schema::InputValueDef;
pub use schema::OperationKind;
pub use schema::Schema;
pub use schema::SchemaError;
pub use schema::SchemaType;
pub use schema::TypeKind;
pub use schema::TypeRef;
