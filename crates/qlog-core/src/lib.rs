// crates/qlog-core/src/lib.rs
// ============================================================================
// Module: Query Log Core Library
// Description: Public API surface for the query log core.
// Purpose: Expose the data model and collaborator interfaces.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Query log core defines the shared vocabulary of the processor: dataset
//! identifiers, skeleton hashes, decoded execution records, the typed schema
//! model built from introspection, and the interfaces through which schema
//! sources, fingerprint stores and fee metrics plug into the ingestion loop.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::DatasetDiscovery;
pub use interfaces::DiscoveryError;
pub use interfaces::FeeMetrics;
pub use interfaces::FingerprintStore;
pub use interfaces::NoopFeeMetrics;
pub use interfaces::SchemaFetchError;
pub use interfaces::SchemaResolver;
pub use interfaces::SchemaSource;
pub use interfaces::StoreError;
