// crates/qlog-config/src/lib.rs
// ============================================================================
// Module: Query Log Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for qlog.toml semantics.
// Dependencies: qlog-core, qlog-schemas, qlog-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `qlog-config` defines the configuration model for the query log
//! processor. Configuration is parsed once, validated fail-closed, and then
//! converted into the constructor inputs of each component.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
