// crates/qlog-schemas/src/introspection.rs
// ============================================================================
// Module: Introspection Schema Source
// Description: Fetches dataset schemas from a graph-node query endpoint.
// Purpose: Provide the network-backed schema source used by the cache.
// Dependencies: crate::{backoff, http}, qlog-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! Each dataset is served at `{endpoint}/subgraphs/id/{dataset}`. The source
//! posts the standard introspection query (without descriptions) and builds a
//! [`Schema`] from the result. Transport failures are retried under the
//! configured backoff policy; a dataset that answers with errors is reported
//! as a query failure right away.

// ============================================================================
// SECTION: Imports
// ============================================================================

use qlog_core::DatasetId;
use qlog_core::Schema;
use qlog_core::SchemaFetchError;
use qlog_core::SchemaSource;
use reqwest::Url;
use reqwest::blocking::Client;
use serde_json::json;
use tracing::debug;

use crate::backoff::BackoffPolicy;
use crate::http::GraphqlFailure;
use crate::http::build_http_client;
use crate::http::post_graphql;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Standard introspection query without descriptions.
pub const INTROSPECTION_QUERY: &str = r"
query IntrospectionQuery {
  __schema {
    queryType { name }
    mutationType { name }
    subscriptionType { name }
    types { ...FullType }
    directives { name locations args { ...InputValue } }
  }
}
fragment FullType on __Type {
  kind
  name
  fields(includeDeprecated: true) {
    name
    args { ...InputValue }
    type { ...TypeRef }
    isDeprecated
    deprecationReason
  }
  inputFields { ...InputValue }
  interfaces { ...TypeRef }
  enumValues(includeDeprecated: true) { name isDeprecated deprecationReason }
  possibleTypes { ...TypeRef }
}
fragment InputValue on __InputValue {
  name
  type { ...TypeRef }
  defaultValue
}
fragment TypeRef on __Type {
  kind
  name
  ofType {
    kind
    name
    ofType {
      kind
      name
      ofType {
        kind
        name
        ofType {
          kind
          name
          ofType {
            kind
            name
            ofType {
              kind
              name
              ofType { kind name }
            }
          }
        }
      }
    }
  }
}
";

/// Default user agent for schema requests.
pub const DEFAULT_USER_AGENT: &str = "qlog/0.1";

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the introspection source.
///
/// # Invariants
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - `timeout_ms` applies to each request attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSourceConfig {
    /// Graph-node query endpoint base URL.
    pub endpoint: Url,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    pub max_response_bytes: usize,
    /// User agent for outbound requests.
    pub user_agent: String,
    /// Retry policy for transport failures.
    pub backoff: BackoffPolicy,
}

impl SchemaSourceConfig {
    /// Creates a configuration with default limits for an endpoint.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout_ms: 5_000,
            max_response_bytes: 16 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            backoff: BackoffPolicy::default(),
        }
    }
}

// ============================================================================
// SECTION: Source
// ============================================================================

/// Schema source backed by graph-node introspection.
pub struct HttpSchemaSource {
    /// Source configuration.
    config: SchemaSourceConfig,
    /// HTTP client used for outbound requests.
    client: Client,
}

impl HttpSchemaSource {
    /// Creates a new introspection source.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaFetchError::Transport`] when the HTTP client cannot be built.
    pub fn new(config: SchemaSourceConfig) -> Result<Self, SchemaFetchError> {
        let client = build_http_client(config.timeout_ms, &config.user_agent)?;
        Ok(Self {
            config,
            client,
        })
    }

    /// Returns the query URL of a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaFetchError::Transport`] when the URL cannot be formed.
    pub fn dataset_url(&self, dataset: &DatasetId) -> Result<Url, SchemaFetchError> {
        let base = self.config.endpoint.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/subgraphs/id/{dataset}"))
            .map_err(|err| SchemaFetchError::Transport(format!("invalid dataset url: {err}")))
    }

    /// Performs one introspection attempt.
    fn fetch_once(&self, url: &Url) -> Result<Schema, SchemaFetchError> {
        let request = json!({ "query": INTROSPECTION_QUERY });
        let data =
            post_graphql(&self.client, url, &request, self.config.max_response_bytes)?;
        Schema::from_introspection(&data).map_err(|err| SchemaFetchError::Invalid(err.to_string()))
    }
}

impl SchemaSource for HttpSchemaSource {
    fn fetch_schema(&self, dataset: &DatasetId) -> Result<Schema, SchemaFetchError> {
        let url = self.dataset_url(dataset)?;
        debug!(dataset = %dataset, "introspecting dataset schema");
        self.config.backoff.retry(
            "introspection",
            || self.fetch_once(&url),
            |err| matches!(err, SchemaFetchError::Transport(_)),
        )
    }
}

impl From<GraphqlFailure> for SchemaFetchError {
    fn from(failure: GraphqlFailure) -> Self {
        match failure {
            GraphqlFailure::Transport(message) => Self::Transport(message),
            GraphqlFailure::Rejected(message) => Self::Query(message),
            GraphqlFailure::Invalid(message) => Self::Invalid(message),
        }
    }
}
