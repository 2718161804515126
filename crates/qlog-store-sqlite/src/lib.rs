// crates/qlog-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Fingerprint Store
// Description: Durable FingerprintStore backend using SQLite.
// Purpose: Persist query skeletons and their execution log.
// Dependencies: qlog-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`FingerprintStore`] with two tables:
//! a write-once skeleton table keyed by content hash, and an append-only log
//! table whose rows reference it by foreign key.
//!
//! [`FingerprintStore`]: qlog_core::FingerprintStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteQueryLogStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::StoredLogRow;
