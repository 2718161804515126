// crates/qlog-cli/src/main.rs
// ============================================================================
// Module: Query Log CLI Entry Point
// Description: Command dispatcher for ingestion, offline normalization and store stats.
// Purpose: Wire configuration, schema cache, store and ingestion loop into a process.
// Dependencies: clap, qlog-config, qlog-processor, qlog-schemas, tokio, tracing.
// ============================================================================

//! ## Overview
//! `qlog run` is the long-running processor: it opens the fingerprint store,
//! prepares the schema cache, starts the fee exporter and drives the
//! ingestion loop until the input is exhausted, a stop signal arrives, or a
//! record fails fatally. The remaining commands are offline utilities.
//! Startup failures exit non-zero before any record is consumed.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use qlog_config::ConfigError;
use qlog_config::LoggingConfig;
use qlog_config::QlogConfig;
use qlog_config::config_toml_example;
use qlog_core::DatasetDiscovery;
use qlog_core::NormalizedQuery;
use qlog_core::Schema;
use qlog_core::SkeletonHash;
use qlog_normalize::normalize_query;
use qlog_processor::DropOldestQueue;
use qlog_processor::FeeCounter;
use qlog_processor::IngestError;
use qlog_processor::IngestLoop;
use qlog_processor::IngestSummary;
use qlog_processor::MetricsExporter;
use qlog_processor::RecordProcessor;
use qlog_processor::ShutdownSignal;
use qlog_processor::spawn_line_reader;
use qlog_schemas::HttpSchemaSource;
use qlog_schemas::IndexerAgentDiscovery;
use qlog_schemas::SchemaCache;
use qlog_schemas::StaticDiscovery;
use qlog_store_sqlite::SqliteQueryLogStore;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a query file passed to `normalize`.
const MAX_QUERY_BYTES: usize = 1024 * 1024;
/// Maximum size of an introspection document passed to `normalize`.
const MAX_SCHEMA_BYTES: usize = 32 * 1024 * 1024;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "qlog", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the ingestion pipeline until the input ends or a stop signal arrives.
    Run(ConfigArgs),
    /// Canonicalize one query offline and print its skeletons.
    Normalize(NormalizeCommand),
    /// Print fingerprint store row counts.
    Stats(ConfigArgs),
    /// Print the datasets reported by the configured discovery source.
    Datasets(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config file selection shared by config-driven commands.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Optional config file path (defaults to qlog.toml or `QLOG_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for the `normalize` command.
#[derive(Args, Debug)]
struct NormalizeCommand {
    /// File holding the GraphQL query text.
    #[arg(long, value_name = "FILE")]
    query: PathBuf,
    /// Variables as a JSON object.
    #[arg(long, value_name = "JSON")]
    variables: Option<String>,
    /// Introspection response (or its `data` object) for the dataset schema.
    #[arg(long, value_name = "FILE")]
    schema: PathBuf,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Check(ConfigArgs),
    /// Print a complete example configuration.
    Example,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing failures.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Creates a new CLI error with the provided message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::new(err.to_string())
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => command_run(args).await,
        Commands::Normalize(command) => command_normalize(&command),
        Commands::Stats(args) => command_stats(&args),
        Commands::Datasets(args) => command_datasets(args).await,
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Loads configuration and installs logging at its level.
fn load_config(path: Option<&Path>) -> CliResult<QlogConfig> {
    let config = QlogConfig::load(path)?;
    init_tracing(&config.logging.level);
    Ok(config)
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let shutdown = ShutdownSignal::new();
    tokio::spawn(forward_stop_signal(shutdown.clone()));

    let summary = tokio::task::spawn_blocking(move || run_pipeline(&config, shutdown))
        .await
        .map_err(|err| CliError::new(format!("ingestion task failed: {err}")))??;
    info!(
        processed = summary.processed,
        discarded = summary.discarded,
        entries = summary.entries_written,
        dropped = summary.dropped,
        "ingestion finished"
    );
    Ok(ExitCode::SUCCESS)
}

/// Builds every component and drives the ingestion loop to completion.
///
/// Blocking HTTP clients are created and dropped here, off the async runtime.
fn run_pipeline(config: &QlogConfig, shutdown: ShutdownSignal) -> CliResult<IngestSummary> {
    let store = SqliteQueryLogStore::new(config.store.sqlite_config())
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    store.readiness().map_err(|err| CliError::new(format!("store not ready: {err}")))?;

    let schemas = build_schema_cache(config)?;
    if config.discovery.warm_on_start {
        let usable = schemas
            .warm()
            .map_err(|err| CliError::new(format!("schema cache warm-up failed: {err}")))?;
        info!(usable, "schema cache ready");
    }

    let fees = Arc::new(FeeCounter::new());
    let _exporter = if config.metrics.enabled {
        let addr = config.metrics.bind_addr()?;
        let exporter = MetricsExporter::start(addr, Arc::clone(&fees))
            .map_err(|err| CliError::new(err.to_string()))?;
        Some(exporter)
    } else {
        None
    };

    let queue = Arc::new(DropOldestQueue::new(config.ingest.queue_capacity));
    let _reader = match config.ingest.input_path() {
        Some(path) => {
            let file = File::open(path).map_err(|err| {
                CliError::new(format!("failed to open input {}: {err}", path.display()))
            })?;
            spawn_line_reader(BufReader::new(file), Arc::clone(&queue))
        }
        None => spawn_line_reader(BufReader::new(std::io::stdin()), Arc::clone(&queue)),
    };

    let processor = RecordProcessor::new(Arc::new(schemas), Arc::new(store), fees);
    let mut ingest = IngestLoop::new(processor, queue, shutdown, config.ingest.poll_interval());
    ingest.run().map_err(|err| match err {
        IngestError::Fatal {
            summary,
            source,
        } => CliError::new(format!(
            "ingestion stopped on fatal failure ({} processed, {} discarded): {source}",
            summary.processed, summary.discarded
        )),
    })
}

/// Builds the schema cache with discovery attached when configured.
fn build_schema_cache(config: &QlogConfig) -> CliResult<SchemaCache<HttpSchemaSource>> {
    let source = HttpSchemaSource::new(config.schema_source.source_config()?)
        .map_err(|err| CliError::new(format!("failed to build schema source: {err}")))?;
    let cache = SchemaCache::new(source);
    if !config.discovery.is_active() {
        return Ok(cache);
    }
    let discovery = build_discovery(config)?;
    Ok(cache.with_discovery(discovery, config.discovery.require_indexed))
}

/// Builds the configured dataset discovery source.
fn build_discovery(config: &QlogConfig) -> CliResult<Arc<dyn DatasetDiscovery>> {
    let backoff = config.schema_source.backoff();
    match config.discovery.indexer_agent(backoff)? {
        Some(agent) => {
            let discovery = IndexerAgentDiscovery::new(agent, config.discovery.indexed.clone())
                .map_err(|err| CliError::new(format!("failed to build discovery: {err}")))?;
            Ok(Arc::new(discovery))
        }
        None => Ok(Arc::new(StaticDiscovery::new(
            config.discovery.indexed.clone(),
            config.discovery.allocated.clone(),
        ))),
    }
}

/// Raises the shutdown signal on Ctrl-C or SIGTERM.
async fn forward_stop_signal(shutdown: ShutdownSignal) {
    wait_for_stop_signal().await;
    info!("stop signal received; finishing in-flight record");
    shutdown.request();
}

/// Waits for Ctrl-C or SIGTERM.
#[cfg(unix)]
async fn wait_for_stop_signal() {
    use tokio::signal::unix::SignalKind;
    use tokio::signal::unix::signal;

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!(error = %err, "ctrl-c handler failed");
                        let _ = terminate.recv().await;
                    }
                }
                _ = terminate.recv() => {}
            }
        }
        Err(err) => {
            warn!(error = %err, "SIGTERM handler unavailable");
            wait_for_ctrl_c().await;
        }
    }
}

/// Waits for Ctrl-C.
#[cfg(not(unix))]
async fn wait_for_stop_signal() {
    wait_for_ctrl_c().await;
}

/// Waits for Ctrl-C, or forever when the handler cannot be installed.
async fn wait_for_ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "ctrl-c handler failed");
        std::future::pending::<()>().await;
    }
}

// ============================================================================
// SECTION: Normalize Command
// ============================================================================

/// Executes the `normalize` command.
fn command_normalize(command: &NormalizeCommand) -> CliResult<ExitCode> {
    init_tracing(&LoggingConfig::default().level);
    let query_bytes = read_bytes_with_limit(&command.query, MAX_QUERY_BYTES)
        .map_err(|err| CliError::new(format!("failed to read query: {err}")))?;
    let query = String::from_utf8(query_bytes)
        .map_err(|_| CliError::new("query file must be utf-8".to_string()))?;
    let variables = match &command.variables {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|err| CliError::new(format!("invalid variables json: {err}")))?,
        None => Value::Null,
    };
    let schema_bytes = read_bytes_with_limit(&command.schema, MAX_SCHEMA_BYTES)
        .map_err(|err| CliError::new(format!("failed to read schema: {err}")))?;
    let schema = parse_schema_document(&schema_bytes)?;

    let normalized = normalize_query(&query, &variables, Some(&schema))
        .map_err(|err| CliError::new(format!("normalization failed: {err}")))?;
    for line in render_normalized(&normalized) {
        write_stdout_line(&line).map_err(|err| output_error(&err))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Parses an introspection document, accepting a full response or its `data` object.
fn parse_schema_document(bytes: &[u8]) -> CliResult<Schema> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|err| CliError::new(format!("invalid schema json: {err}")))?;
    let data = document.get("data").unwrap_or(&document);
    Schema::from_introspection(data)
        .map_err(|err| CliError::new(format!("invalid introspection schema: {err}")))
}

/// Renders one tab-separated line per root query: hash, skeleton, variables.
fn render_normalized(entries: &[NormalizedQuery]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| {
            let hash = SkeletonHash::of_text(&entry.skeleton);
            let variables = Value::Array(entry.variables.clone());
            format!("{hash}\t{}\t{variables}", entry.skeleton)
        })
        .collect()
}

// ============================================================================
// SECTION: Store Commands
// ============================================================================

/// Executes the `stats` command.
fn command_stats(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let store = SqliteQueryLogStore::new(config.store.sqlite_config())
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    let skeletons =
        store.skeleton_count().map_err(|err| CliError::new(format!("stats failed: {err}")))?;
    let logs = store.log_count().map_err(|err| CliError::new(format!("stats failed: {err}")))?;
    write_stdout_line(&format!("skeletons: {skeletons}")).map_err(|err| output_error(&err))?;
    write_stdout_line(&format!("log rows: {logs}")).map_err(|err| output_error(&err))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Discovery Command
// ============================================================================

/// Executes the `datasets` command.
async fn command_datasets(args: ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args.config.as_deref())?;
    let lines = tokio::task::spawn_blocking(move || {
        let discovery = build_discovery(&config)?;
        let indexed = discovery
            .indexed_datasets()
            .map_err(|err| CliError::new(format!("discovery failed: {err}")))?;
        let allocated = discovery
            .allocated_datasets()
            .map_err(|err| CliError::new(format!("discovery failed: {err}")))?;
        let mut lines: Vec<String> =
            indexed.iter().map(|dataset| format!("indexed\t{dataset}")).collect();
        lines.extend(allocated.iter().map(|dataset| format!("allocated\t{dataset}")));
        Ok::<_, CliError>(lines)
    })
    .await
    .map_err(|err| CliError::new(format!("discovery task failed: {err}")))??;
    for line in lines {
        write_stdout_line(&line).map_err(|err| output_error(&err))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Check(args) => {
            let _config = QlogConfig::load(args.config.as_deref())?;
            write_stdout_line("config ok").map_err(|err| output_error(&err))?;
        }
        ConfigCommand::Example => {
            let mut stdout = std::io::stdout();
            stdout
                .write_all(config_toml_example().as_bytes())
                .map_err(|err| output_error(&err))?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: File Helpers
// ============================================================================

/// Errors raised while reading bounded input files.
#[derive(Debug, Error)]
enum ReadLimitError {
    /// File I/O failure.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// File size exceeds the configured limit.
    #[error("file is {size} bytes; limit is {limit}")]
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Wraps a stdout write failure.
fn output_error(error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write to stdout: {error}"))
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
