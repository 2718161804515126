// crates/qlog-schemas/src/lib.rs
// ============================================================================
// Module: Query Log Schemas Library
// Description: Schema retrieval, caching and dataset discovery.
// Purpose: Resolve dataset identifiers to typed query schemas.
// Dependencies: qlog-core, reqwest, serde_json, tracing
// ============================================================================

//! ## Overview
//! [`SchemaCache`] memoizes schemas fetched by a [`qlog_core::SchemaSource`],
//! normally [`HttpSchemaSource`]. Discovery implementations report which
//! datasets are indexed and allocated so the cache can warm up and refuse
//! unknown datasets.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod backoff;
pub mod cache;
pub mod discovery;
pub mod http;
pub mod introspection;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use backoff::BackoffPolicy;
pub use cache::SchemaCache;
pub use cache::WarmError;
pub use discovery::DEFAULT_NETWORKS;
pub use discovery::IndexerAgentConfig;
pub use discovery::IndexerAgentDiscovery;
pub use discovery::StaticDiscovery;
pub use http::GraphqlFailure;
pub use introspection::DEFAULT_USER_AGENT;
pub use introspection::HttpSchemaSource;
pub use introspection::INTROSPECTION_QUERY;
pub use introspection::SchemaSourceConfig;
pub use reqwest::Url;
