// crates/qlog-normalize/src/lib.rs
// ============================================================================
// Module: Query Normalization Library
// Description: Canonicalization of executed GraphQL queries.
// Purpose: Reduce queries to value-free skeletons plus their extracted values.
// Dependencies: graphql-parser, qlog-core, serde_json
// ============================================================================

//! ## Overview
//! Normalization turns a raw query, its variable bindings and the dataset
//! schema into one `(skeleton, values)` pair per root query. Structurally
//! identical queries that differ only in literal values, argument order,
//! field order or operation name produce byte-identical skeletons.
//!
//! The parser is a collaborator; every rewriting stage and the printer live in
//! this crate and operate on an owned tree.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod ast;
pub mod defaults;
pub mod error;
pub mod factorize;
pub mod fragments;
pub mod pipeline;
pub mod printer;
pub mod prune;
pub mod roots;
pub mod sort;
pub mod typed;
pub mod unknown_args;
pub mod values;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use error::NormalizeError;
pub use pipeline::decode_variables;
pub use pipeline::normalize_query;
