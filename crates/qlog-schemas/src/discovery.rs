// crates/qlog-schemas/src/discovery.rs
// ============================================================================
// Module: Dataset Discovery
// Description: Snapshots of indexed and allocated datasets.
// Purpose: Tell the schema cache which datasets exist and which are served.
// Dependencies: crate::{backoff, http}, qlog-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! [`StaticDiscovery`] serves fixed sets from configuration.
//! [`IndexerAgentDiscovery`] asks an indexer-agent management endpoint for the
//! allocations of each protocol network. A network the agent does not serve
//! answers with an error and is skipped; discovery fails only when every
//! network fails.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use qlog_core::DatasetDiscovery;
use qlog_core::DatasetId;
use qlog_core::DiscoveryError;
use reqwest::Url;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use tracing::warn;

use crate::backoff::BackoffPolicy;
use crate::http::GraphqlFailure;
use crate::http::build_http_client;
use crate::http::post_graphql;
use crate::introspection::DEFAULT_USER_AGENT;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Allocation query sent to the indexer agent.
pub const ALLOCATIONS_QUERY: &str = r"
query ($protocolNetwork: String!) {
  indexerAllocations(protocolNetwork: $protocolNetwork) {
    subgraphDeployment
  }
}
";

/// Protocol networks queried when none are configured.
pub const DEFAULT_NETWORKS: [&str; 2] = ["mainnet", "arbitrum-one"];

// ============================================================================
// SECTION: Static Discovery
// ============================================================================

/// Discovery backed by fixed dataset sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticDiscovery {
    /// Indexed datasets.
    indexed: BTreeSet<DatasetId>,
    /// Allocated datasets.
    allocated: BTreeSet<DatasetId>,
}

impl StaticDiscovery {
    /// Creates a static discovery snapshot.
    #[must_use]
    pub const fn new(indexed: BTreeSet<DatasetId>, allocated: BTreeSet<DatasetId>) -> Self {
        Self {
            indexed,
            allocated,
        }
    }
}

impl DatasetDiscovery for StaticDiscovery {
    fn indexed_datasets(&self) -> Result<BTreeSet<DatasetId>, DiscoveryError> {
        Ok(self.indexed.clone())
    }

    fn allocated_datasets(&self) -> Result<BTreeSet<DatasetId>, DiscoveryError> {
        Ok(self.allocated.clone())
    }
}

// ============================================================================
// SECTION: Indexer Agent Discovery
// ============================================================================

/// Configuration for indexer-agent discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerAgentConfig {
    /// Management endpoint URL.
    pub endpoint: Url,
    /// Protocol networks to query.
    pub networks: Vec<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    pub max_response_bytes: usize,
    /// Retry policy for transport failures.
    pub backoff: BackoffPolicy,
}

impl IndexerAgentConfig {
    /// Creates a configuration with default networks and limits.
    #[must_use]
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            networks: DEFAULT_NETWORKS.iter().map(ToString::to_string).collect(),
            timeout_ms: 5_000,
            max_response_bytes: 4 * 1024 * 1024,
            backoff: BackoffPolicy::default(),
        }
    }
}

/// Allocation snapshot shape.
#[derive(Debug, Deserialize)]
struct AllocationsData {
    /// Allocations of one network.
    #[serde(rename = "indexerAllocations")]
    allocations: Vec<Allocation>,
}

/// One allocation.
#[derive(Debug, Deserialize)]
struct Allocation {
    /// Allocated dataset identifier.
    #[serde(rename = "subgraphDeployment")]
    deployment: String,
}

/// Discovery backed by an indexer-agent management endpoint.
///
/// The agent reports allocations only; the indexed set is supplied up front.
pub struct IndexerAgentDiscovery {
    /// Discovery configuration.
    config: IndexerAgentConfig,
    /// HTTP client used for outbound requests.
    client: Client,
    /// Indexed datasets.
    indexed: BTreeSet<DatasetId>,
}

impl IndexerAgentDiscovery {
    /// Creates indexer-agent discovery.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the HTTP client cannot be built.
    pub fn new(
        config: IndexerAgentConfig,
        indexed: BTreeSet<DatasetId>,
    ) -> Result<Self, DiscoveryError> {
        let client = build_http_client(config.timeout_ms, DEFAULT_USER_AGENT)
            .map_err(|err| DiscoveryError::Unavailable(err.to_string()))?;
        Ok(Self {
            config,
            client,
            indexed,
        })
    }

    /// Fetches the allocations of one network.
    fn network_allocations(&self, network: &str) -> Result<BTreeSet<DatasetId>, GraphqlFailure> {
        let request = json!({
            "query": ALLOCATIONS_QUERY,
            "variables": { "protocolNetwork": network },
        });
        let data = self.config.backoff.retry(
            "indexer allocations",
            || {
                post_graphql(
                    &self.client,
                    &self.config.endpoint,
                    &request,
                    self.config.max_response_bytes,
                )
            },
            |failure| matches!(failure, GraphqlFailure::Transport(_)),
        )?;
        let snapshot = AllocationsData::deserialize(&data)
            .map_err(|err| GraphqlFailure::Invalid(err.to_string()))?;
        let mut datasets = BTreeSet::new();
        for allocation in snapshot.allocations {
            match DatasetId::parse(&allocation.deployment) {
                Ok(dataset) => {
                    datasets.insert(dataset);
                }
                Err(err) => {
                    warn!(network, error = %err, "skipping malformed allocation deployment");
                }
            }
        }
        Ok(datasets)
    }
}

impl DatasetDiscovery for IndexerAgentDiscovery {
    fn indexed_datasets(&self) -> Result<BTreeSet<DatasetId>, DiscoveryError> {
        Ok(self.indexed.clone())
    }

    fn allocated_datasets(&self) -> Result<BTreeSet<DatasetId>, DiscoveryError> {
        let mut allocated = BTreeSet::new();
        let mut answered = false;
        for network in &self.config.networks {
            match self.network_allocations(network) {
                Ok(datasets) => {
                    answered = true;
                    allocated.extend(datasets);
                }
                Err(GraphqlFailure::Rejected(message)) => {
                    info!(network = %network, error = %message, "ignoring network allocations");
                }
                Err(failure) => return Err(DiscoveryError::Unavailable(failure.to_string())),
            }
        }
        if !answered {
            return Err(DiscoveryError::Unavailable(format!(
                "allocations unavailable for every network: {}",
                self.config.networks.join(", ")
            )));
        }
        Ok(allocated)
    }
}
