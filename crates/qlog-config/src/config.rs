// crates/qlog-config/src/config.rs
// ============================================================================
// Module: Query Log Configuration
// Description: Configuration loading and validation for the query log processor.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: qlog-core, qlog-schemas, qlog-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Missing or invalid configuration fails closed. Once validated, the
//! configuration is immutable and each section converts into the typed
//! configuration of the component it drives.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use qlog_core::DatasetId;
use qlog_schemas::BackoffPolicy;
use qlog_schemas::DEFAULT_NETWORKS;
use qlog_schemas::DEFAULT_USER_AGENT;
use qlog_schemas::IndexerAgentConfig;
use qlog_schemas::SchemaSourceConfig;
use qlog_schemas::Url;
use qlog_store_sqlite::SqliteStoreConfig;
use qlog_store_sqlite::SqliteStoreMode;
use qlog_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "qlog.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "QLOG_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum accepted introspection response size.
const MAX_RESPONSE_BYTES_LIMIT: usize = 256 * 1024 * 1024;
/// Maximum ingestion queue capacity.
const MAX_QUEUE_CAPACITY: usize = 1_000_000;
/// Input value selecting standard input.
pub const STDIN_INPUT: &str = "-";

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Query log processor configuration.
///
/// # Invariants
/// - `validate` has succeeded before the value is handed to any component.
#[derive(Debug, Clone, Deserialize)]
pub struct QlogConfig {
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Schema introspection endpoint configuration.
    pub schema_source: IntrospectionConfig,
    /// Dataset discovery configuration.
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    /// Fingerprint store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Ingestion configuration.
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Fee metrics exporter configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl QlogConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        self.schema_source.validate()?;
        self.discovery.validate()?;
        self.store.validate()?;
        self.ingest.validate()?;
        self.metrics.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging level must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Returns the default log level.
fn default_log_level() -> String {
    "warn".to_string()
}

// ============================================================================
// SECTION: Schema Source
// ============================================================================

/// Schema introspection endpoint configuration.
///
/// # Invariants
/// - `endpoint` is an absolute http or https URL.
/// - `initial_backoff_ms <= max_backoff_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IntrospectionConfig {
    /// Graph-node query endpoint base URL.
    pub endpoint: String,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Total retry budget for transport failures in milliseconds.
    #[serde(default = "default_retry_budget_ms")]
    pub retry_budget_ms: u64,
    /// First retry delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Retry delay cap in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// User agent for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl IntrospectionConfig {
    /// Validates introspection configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        parse_http_url("schema_source endpoint", &self.endpoint)?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "schema_source timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_response_bytes == 0 || self.max_response_bytes > MAX_RESPONSE_BYTES_LIMIT {
            return Err(ConfigError::Invalid(
                "schema_source max_response_bytes out of range".to_string(),
            ));
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(
                "schema_source initial_backoff_ms must not exceed max_backoff_ms".to_string(),
            ));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "schema_source user_agent must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the retry policy for transport failures.
    #[must_use]
    pub const fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial: Duration::from_millis(self.initial_backoff_ms),
            max: Duration::from_millis(self.max_backoff_ms),
            budget: Duration::from_millis(self.retry_budget_ms),
        }
    }

    /// Converts the section into the introspection source configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoint is not a valid URL.
    pub fn source_config(&self) -> Result<SchemaSourceConfig, ConfigError> {
        Ok(SchemaSourceConfig {
            endpoint: parse_http_url("schema_source endpoint", &self.endpoint)?,
            timeout_ms: self.timeout_ms,
            max_response_bytes: self.max_response_bytes,
            user_agent: self.user_agent.clone(),
            backoff: self.backoff(),
        })
    }
}

/// Returns the default request timeout.
const fn default_timeout_ms() -> u64 {
    5_000
}

/// Returns the default response size limit.
const fn default_max_response_bytes() -> usize {
    16 * 1024 * 1024
}

/// Returns the default retry budget.
const fn default_retry_budget_ms() -> u64 {
    30_000
}

/// Returns the default first retry delay.
const fn default_initial_backoff_ms() -> u64 {
    100
}

/// Returns the default retry delay cap.
const fn default_max_backoff_ms() -> u64 {
    5_000
}

/// Returns the default user agent.
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Dataset discovery configuration.
///
/// Dataset identifiers are validated while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveryConfig {
    /// Datasets currently indexed.
    #[serde(default)]
    pub indexed: BTreeSet<DatasetId>,
    /// Datasets currently allocated, when no indexer agent is configured.
    #[serde(default)]
    pub allocated: BTreeSet<DatasetId>,
    /// Optional indexer-agent management endpoint for allocations.
    #[serde(default)]
    pub indexer_agent_endpoint: Option<String>,
    /// Protocol networks queried on the indexer agent.
    #[serde(default = "default_networks")]
    pub networks: Vec<String>,
    /// Resolve every indexed dataset before ingestion starts.
    #[serde(default)]
    pub warm_on_start: bool,
    /// Refuse to fetch schemas of datasets outside the indexed set.
    #[serde(default)]
    pub require_indexed: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            indexed: BTreeSet::new(),
            allocated: BTreeSet::new(),
            indexer_agent_endpoint: None,
            networks: default_networks(),
            warm_on_start: false,
            require_indexed: false,
        }
    }
}

impl DiscoveryConfig {
    /// Validates discovery configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(endpoint) = &self.indexer_agent_endpoint {
            parse_http_url("discovery indexer_agent_endpoint", endpoint)?;
            if self.networks.is_empty() {
                return Err(ConfigError::Invalid(
                    "discovery networks must be non-empty with an indexer agent".to_string(),
                ));
            }
        }
        if self.networks.iter().any(|network| network.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "discovery networks must not contain empty names".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns true when discovery is consulted by the schema cache.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.warm_on_start || self.require_indexed
    }

    /// Builds the indexer-agent configuration, when an endpoint is set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the endpoint is not a valid URL.
    pub fn indexer_agent(
        &self,
        backoff: BackoffPolicy,
    ) -> Result<Option<IndexerAgentConfig>, ConfigError> {
        let Some(endpoint) = &self.indexer_agent_endpoint else {
            return Ok(None);
        };
        let mut config =
            IndexerAgentConfig::new(parse_http_url("discovery indexer_agent_endpoint", endpoint)?);
        config.networks.clone_from(&self.networks);
        config.backoff = backoff;
        Ok(Some(config))
    }
}

/// Returns the default protocol networks.
fn default_networks() -> Vec<String> {
    DEFAULT_NETWORKS.iter().map(ToString::to_string).collect()
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Fingerprint store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path(&self.path)?;
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store path must be non-empty".to_string()));
        }
        Ok(())
    }

    /// Converts the section into the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Returns the default database path.
fn default_store_path() -> PathBuf {
    PathBuf::from("qlog.db")
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Ingest
// ============================================================================

/// Ingestion configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IngestConfig {
    /// Bounded queue capacity; the oldest message is dropped on overflow.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Queue poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Newline-delimited message source: `-` for stdin or a file path.
    #[serde(default = "default_input")]
    pub input: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            poll_interval_ms: default_poll_interval_ms(),
            input: default_input(),
        }
    }
}

impl IngestConfig {
    /// Validates ingestion configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_capacity == 0 || self.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::Invalid("ingest queue_capacity out of range".to_string()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "ingest poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.input.trim().is_empty() {
            return Err(ConfigError::Invalid("ingest input must be non-empty".to_string()));
        }
        if self.input != STDIN_INPUT {
            validate_path(Path::new(&self.input))?;
        }
        Ok(())
    }

    /// Returns the input file path, or `None` for standard input.
    #[must_use]
    pub fn input_path(&self) -> Option<&Path> {
        (self.input != STDIN_INPUT).then(|| Path::new(&self.input))
    }

    /// Returns the queue poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Returns the default queue capacity.
const fn default_queue_capacity() -> usize {
    1_000
}

/// Returns the default poll interval.
const fn default_poll_interval_ms() -> u64 {
    250
}

/// Returns the default input source.
fn default_input() -> String {
    STDIN_INPUT.to_string()
}

// ============================================================================
// SECTION: Metrics
// ============================================================================

/// Fee metrics exporter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetricsConfig {
    /// Serve the metrics endpoint.
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    /// Listen address of the metrics endpoint.
    #[serde(default = "default_metrics_bind")]
    pub bind: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            bind: default_metrics_bind(),
        }
    }
}

impl MetricsConfig {
    /// Validates metrics configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.enabled {
            self.bind_addr()?;
        }
        Ok(())
    }

    /// Parses the listen address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `bind` is not a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("metrics bind is not a socket address: {}", self.bind)))
    }
}

/// Returns whether metrics are enabled by default.
const fn default_metrics_enabled() -> bool {
    true
}

/// Returns the default metrics listen address.
fn default_metrics_bind() -> String {
    "0.0.0.0:8000".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// # Errors
///
/// Returns [`ConfigError`] when the environment override is too long.
pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("path component too long".to_string()));
        }
    }
    Ok(())
}

/// Parses an absolute http or https URL.
fn parse_http_url(field: &str, value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value.trim())
        .map_err(|err| ConfigError::Invalid(format!("{field} is not a valid url: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(ConfigError::Invalid(format!("{field} has unsupported scheme: {scheme}"))),
    }
}
