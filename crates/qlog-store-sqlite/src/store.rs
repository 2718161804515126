// crates/qlog-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Fingerprint Store
// Description: Durable FingerprintStore backed by SQLite.
// Purpose: Persist write-once skeletons and append-only execution log rows.
// Dependencies: qlog-core, rusqlite, serde, serde_json, thiserror, uuid
// ============================================================================

//! ## Overview
//! This module implements a durable [`FingerprintStore`] using `SQLite`.
//! Skeleton rows are keyed by the content hash of their text and are never
//! updated; an insert of known text is a no-op and an insert whose hash names
//! different text fails as an integrity error. Log rows reference skeletons
//! through an enforced foreign key. All rows produced by one raw record are
//! committed in a single transaction.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use qlog_core::DatasetId;
use qlog_core::FingerprintStore;
use qlog_core::LogEntry;
use qlog_core::LogRowId;
use qlog_core::SkeletonHash;
use qlog_core::StoreError;
use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Transaction;
use rusqlite::params;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `journal_mode` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode.
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
///
/// # Invariants
/// - Values map 1:1 to `SQLite` `synchronous` pragma settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` fingerprint store.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
/// - `busy_timeout_ms` is interpreted as milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Creates a configuration with default pragmas for a database path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
///
/// # Invariants
/// - Error messages avoid embedding skeleton text or variable payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// Hash collision or dangling skeleton reference.
    #[error("sqlite store integrity failure: {0}")]
    Integrity(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) | SqliteStoreError::VersionMismatch(message) => {
                Self::Db(message)
            }
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::Integrity(message) => Self::Integrity(message),
        }
    }
}

/// Maps an engine error, singling out foreign-key violations.
fn map_db_error(err: &rusqlite::Error) -> SqliteStoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = err
        && failure.code == ErrorCode::ConstraintViolation
        && failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
    {
        return SqliteStoreError::Integrity("log row references a missing skeleton".to_string());
    }
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================
// SECTION: Stored Rows
// ============================================================================

/// Execution log row as read back from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLogRow {
    /// Row identifier.
    pub id: LogRowId,
    /// Dataset the query ran against.
    pub dataset: DatasetId,
    /// Referenced skeleton hash.
    pub skeleton_hash: SkeletonHash,
    /// Wall-clock time of execution in unix milliseconds.
    pub timestamp_ms: i64,
    /// Response time, when attributable.
    pub response_time_ms: Option<i64>,
    /// Extracted values as stored.
    pub variables: Option<Value>,
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed fingerprint store.
///
/// # Invariants
/// - Skeleton rows are write-once and keyed by the hash of their text.
/// - Foreign keys are enforced on every connection.
/// - `SQLite` connection access is serialized through a mutex.
pub struct SqliteQueryLogStore {
    /// Shared connection guarded by a mutex.
    connection: Mutex<Connection>,
}

impl SqliteQueryLogStore {
    /// Opens an `SQLite`-backed fingerprint store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    /// Verifies the store can execute a simple SQL statement.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] if the mutex is poisoned or the query fails.
    pub fn readiness(&self) -> Result<(), SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    /// Returns the text stored for a skeleton hash.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn skeleton_text(&self, hash: &SkeletonHash) -> Result<Option<String>, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .query_row(
                "SELECT query FROM query_skeletons WHERE hash = ?1",
                params![hash.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))
    }

    /// Returns the number of skeleton rows.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn skeleton_count(&self) -> Result<u64, SqliteStoreError> {
        self.count_rows("SELECT COUNT(*) FROM query_skeletons")
    }

    /// Returns the number of log rows.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails.
    pub fn log_count(&self) -> Result<u64, SqliteStoreError> {
        self.count_rows("SELECT COUNT(*) FROM query_logs")
    }

    /// Returns the log rows referencing a skeleton, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the query fails or a stored row is malformed.
    pub fn logs_for_hash(&self, hash: &SkeletonHash) -> Result<Vec<StoredLogRow>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut stmt = guard
            .prepare_cached(
                "SELECT id, dataset, query_hash, timestamp, query_time_ms, query_variables FROM \
                 query_logs WHERE query_hash = ?1 ORDER BY timestamp, rowid",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let raw_rows = stmt
            .query_map(params![hash.as_bytes().as_slice()], |row| {
                Ok(RawLogRow {
                    id: row.get(0)?,
                    dataset: row.get(1)?,
                    query_hash: row.get(2)?,
                    timestamp: row.get(3)?,
                    query_time_ms: row.get(4)?,
                    query_variables: row.get(5)?,
                })
            })
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let mut rows = Vec::new();
        for raw in raw_rows {
            let raw = raw.map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            rows.push(raw.into_stored()?);
        }
        Ok(rows)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection
            .lock()
            .map_err(|_| SqliteStoreError::Io("sqlite mutex poisoned".to_string()))
    }

    /// Runs a single-value count query.
    fn count_rows(&self, sql: &str) -> Result<u64, SqliteStoreError> {
        let guard = self.lock()?;
        let count: i64 = guard
            .query_row(sql, [], |row| row.get(0))
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        u64::try_from(count).map_err(|_| SqliteStoreError::Invalid("negative row count".to_string()))
    }

    /// Runs `work` inside one transaction, committing only on success.
    fn in_transaction<T>(
        &self,
        work: impl FnOnce(&Transaction<'_>) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let value = work(&tx)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(value)
    }
}

impl FingerprintStore for SqliteQueryLogStore {
    fn record_skeleton(&self, skeleton: &str) -> Result<SkeletonHash, StoreError> {
        Ok(self.in_transaction(|tx| insert_skeleton_in_tx(tx, skeleton))?)
    }

    fn append_log(&self, entry: &LogEntry) -> Result<LogRowId, StoreError> {
        Ok(self.in_transaction(|tx| insert_log_in_tx(tx, entry))?)
    }

    fn record_execution(&self, entries: &[LogEntry]) -> Result<Vec<LogRowId>, StoreError> {
        Ok(self.in_transaction(|tx| {
            let mut ids = Vec::with_capacity(entries.len());
            for entry in entries {
                insert_skeleton_in_tx(tx, &entry.skeleton)?;
                ids.push(insert_log_in_tx(tx, entry)?);
            }
            Ok(ids)
        })?)
    }
}

// ============================================================================
// SECTION: Writes
// ============================================================================

/// Inserts a skeleton if absent and verifies any existing row names the same text.
fn insert_skeleton_in_tx(
    tx: &Transaction<'_>,
    skeleton: &str,
) -> Result<SkeletonHash, SqliteStoreError> {
    let hash = SkeletonHash::of_text(skeleton);
    let inserted = {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO query_skeletons (hash, query) VALUES (?1, ?2) ON CONFLICT(hash) DO \
                 NOTHING",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        stmt.execute(params![hash.as_bytes().as_slice(), skeleton]).map_err(|err| map_db_error(&err))?
    };
    if inserted == 0 {
        let stored: String = tx
            .query_row(
                "SELECT query FROM query_skeletons WHERE hash = ?1",
                params![hash.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        if stored != skeleton {
            return Err(SqliteStoreError::Integrity(format!(
                "skeleton hash {hash} already names different text"
            )));
        }
    }
    Ok(hash)
}

/// Inserts one log row.
fn insert_log_in_tx(tx: &Transaction<'_>, entry: &LogEntry) -> Result<LogRowId, SqliteStoreError> {
    if SkeletonHash::of_text(&entry.skeleton) != entry.skeleton_hash {
        return Err(SqliteStoreError::Invalid(format!(
            "log entry hash {} does not match its skeleton",
            entry.skeleton_hash
        )));
    }
    let variables = entry
        .variables
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    let id = LogRowId::generate();
    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO query_logs (id, dataset, query_hash, timestamp, query_time_ms, \
             query_variables) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    stmt.execute(params![
        id.to_string(),
        entry.dataset.as_str(),
        entry.skeleton_hash.as_bytes().as_slice(),
        entry.timestamp_ms,
        entry.response_time_ms,
        variables
    ])
    .map_err(|err| map_db_error(&err))?;
    Ok(id)
}

// ============================================================================
// SECTION: Reads
// ============================================================================

/// Log row columns as stored.
struct RawLogRow {
    /// Row id text.
    id: String,
    /// Dataset text.
    dataset: String,
    /// Skeleton hash bytes.
    query_hash: Vec<u8>,
    /// Timestamp column.
    timestamp: i64,
    /// Response time column.
    query_time_ms: Option<i64>,
    /// Variables JSON text.
    query_variables: Option<String>,
}

impl RawLogRow {
    /// Validates and converts a stored row.
    fn into_stored(self) -> Result<StoredLogRow, SqliteStoreError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|err| SqliteStoreError::Invalid(format!("malformed log row id: {err}")))?;
        let dataset = DatasetId::parse(&self.dataset)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let skeleton_hash = SkeletonHash::from_slice(&self.query_hash)
            .ok_or_else(|| SqliteStoreError::Invalid("malformed skeleton hash".to_string()))?;
        let variables = self
            .query_variables
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(|err| SqliteStoreError::Invalid(format!("malformed variables: {err}")))?;
        Ok(StoredLogRow {
            id: LogRowId::from_uuid(id),
            dataset,
            skeleton_hash,
            timestamp_ms: self.timestamp,
            response_time_ms: self.query_time_ms,
            variables,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    if path.as_os_str().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with enforced foreign keys.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability and integrity.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS query_skeletons (
                    hash BLOB PRIMARY KEY,
                    query TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS query_logs (
                    id TEXT PRIMARY KEY,
                    dataset TEXT NOT NULL,
                    query_hash BLOB NOT NULL REFERENCES query_skeletons(hash),
                    timestamp INTEGER NOT NULL,
                    query_time_ms INTEGER,
                    query_variables TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_query_logs_query_hash
                    ON query_logs (query_hash);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
