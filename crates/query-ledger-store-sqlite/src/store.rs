// query-ledger-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Query Record Store
// Description: Durable QueryRecordStore and CatalogIndex backed by SQLite.
// Purpose: Persist query records in one table with transactional updates.
// Dependencies: query-ledger-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`QueryRecordStore`] and [`CatalogIndex`] on a
//! single `SQLite` table whose columns come from [`RECORD_COLUMNS`]. Every
//! mutation runs in a transaction; status updates re-check the transition
//! rule inside the same transaction so terminal records stay terminal.
//! Labels that fail to parse on read are reported as corruption.
//! Security posture: database contents are untrusted and fail closed.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use query_ledger_core::Backend;
use query_ledger_core::CatalogIndex;
use query_ledger_core::QueryId;
use query_ledger_core::QueryRecord;
use query_ledger_core::QueryRecordStore;
use query_ledger_core::QueryStatus;
use query_ledger_core::RECORD_COLUMNS;
use query_ledger_core::RECORD_TABLE;
use query_ledger_core::RangeSelection;
use query_ledger_core::RecordUpdate;
use query_ledger_core::RelationKey;
use query_ledger_core::ResultSchema;
use query_ledger_core::StoreError;
use query_ledger_core::Timestamp;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Params;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
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

/// Configuration for the `SQLite` query store.
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
    /// Creates a configuration with default pragmas for `path`.
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

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Stored row could not be decoded.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
    /// No record exists for the identifier.
    #[error("query {0} not found")]
    NotFound(QueryId),
    /// A record with the identifier already exists.
    #[error("query {0} already exists")]
    DuplicateKey(QueryId),
    /// The update would leave a terminal state or skip a state.
    #[error("query {query_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Record identifier.
        query_id: QueryId,
        /// Current status.
        from: QueryStatus,
        /// Requested status.
        to: QueryStatus,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::Corrupt(message) => Self::Corrupt(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
            SqliteStoreError::NotFound(query_id) => Self::NotFound(query_id),
            SqliteStoreError::DuplicateKey(query_id) => Self::DuplicateKey(query_id),
            SqliteStoreError::InvalidTransition {
                query_id,
                from,
                to,
            } => Self::InvalidTransition {
                query_id,
                from,
                to,
            },
        }
    }
}

/// Maps an engine error.
#[allow(clippy::needless_pass_by_value, reason = "Used directly as a map_err callback.")]
fn db_error(err: rusqlite::Error) -> SqliteStoreError {
    SqliteStoreError::Db(err.to_string())
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed query record store. Clones share one connection.
#[derive(Clone)]
pub struct SqliteQueryStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteQueryStore {
    /// Opens the store, creating the database and record table when absent.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened, its
    /// schema version is unsupported, or the record table cannot be created.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_meta(&mut connection)?;
        let store = Self {
            connection: Arc::new(Mutex::new(connection)),
        };
        store.create_record_table()?;
        Ok(store)
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Creates the record table and its lookup indexes.
    fn create_record_table(&self) -> Result<(), SqliteStoreError> {
        self.lock()?.execute_batch(&record_table_ddl()).map_err(db_error)
    }

    /// Inserts a record unless its id is taken.
    fn insert_record(&self, record: &QueryRecord) -> Result<(), SqliteStoreError> {
        let id = id_to_sql(record.query_id)?;
        let schema =
            record.schema.to_json().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let exists: Option<i64> = tx
            .query_row(
                &format!("SELECT \"queryId\" FROM {RECORD_TABLE} WHERE \"queryId\" = ?1"),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .map_err(db_error)?;
        if exists.is_some() {
            return Err(SqliteStoreError::DuplicateKey(record.query_id));
        }
        tx.execute(
            &format!(
                "INSERT INTO {RECORD_TABLE} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
                 ?11, ?12, ?13, ?14, ?15)",
                column_list()
            ),
            params![
                record.relation_key.user_name,
                record.relation_key.program_name,
                record.relation_key.relation_name,
                id,
                record.created.as_unix_nanos(),
                record.url,
                record.status.as_str(),
                record.start_time.as_unix_nanos(),
                record.end_time.map(Timestamp::as_unix_nanos),
                record.elapsed_nanos,
                record.num_tuples,
                schema,
                record.backend.as_str(),
                record.query,
                record.storage.as_str(),
            ],
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)
    }

    /// Applies a partial update inside one transaction.
    fn update_record(
        &self,
        query_id: QueryId,
        update: &RecordUpdate,
    ) -> Result<(), SqliteStoreError> {
        let id = id_to_sql(query_id)?;
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(db_error)?;
        let raw = tx
            .query_row(
                &format!("SELECT {} FROM {RECORD_TABLE} WHERE \"queryId\" = ?1", column_list()),
                params![id],
                RawRecord::from_row,
            )
            .optional()
            .map_err(db_error)?
            .ok_or(SqliteStoreError::NotFound(query_id))?;
        let mut record = raw.into_record()?;
        if let Some(next) = update.status
            && next != record.status
            && !record.status.can_transition_to(next)
        {
            return Err(SqliteStoreError::InvalidTransition {
                query_id,
                from: record.status,
                to: next,
            });
        }
        update.apply_to(&mut record);
        let schema =
            record.schema.to_json().map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        tx.execute(
            &format!(
                "UPDATE {RECORD_TABLE} SET \"status\" = ?1, \"endTime\" = ?2, \"elapsed\" = ?3, \
                 \"numTuples\" = ?4, \"schema\" = ?5 WHERE \"queryId\" = ?6"
            ),
            params![
                record.status.as_str(),
                record.end_time.map(Timestamp::as_unix_nanos),
                record.elapsed_nanos,
                record.num_tuples,
                schema,
                id,
            ],
        )
        .map_err(db_error)?;
        tx.commit().map_err(db_error)
    }

    /// Runs a record query and decodes every row.
    fn select_records<P: Params>(
        &self,
        filter: &str,
        params: P,
    ) -> Result<Vec<QueryRecord>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!("SELECT {} FROM {RECORD_TABLE} {filter}", column_list()))
            .map_err(db_error)?;
        let rows = statement.query_map(params, RawRecord::from_row).map_err(db_error)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(db_error)?.into_record()?);
        }
        Ok(records)
    }

    /// Runs a single-value id aggregate.
    fn select_id<P: Params>(
        &self,
        sql: &str,
        params: P,
    ) -> Result<Option<QueryId>, SqliteStoreError> {
        let value: Option<i64> =
            self.lock()?.query_row(sql, params, |row| row.get(0)).map_err(db_error)?;
        value.map(id_from_sql).transpose()
    }
}

impl QueryRecordStore for SqliteQueryStore {
    fn create_table(&self) -> Result<(), StoreError> {
        self.create_record_table().map_err(StoreError::from)
    }

    fn insert(&self, record: &QueryRecord) -> Result<(), StoreError> {
        self.insert_record(record).map_err(StoreError::from)
    }

    fn update(&self, query_id: QueryId, update: &RecordUpdate) -> Result<(), StoreError> {
        self.update_record(query_id, update).map_err(StoreError::from)
    }

    fn get(&self, query_id: QueryId) -> Result<QueryRecord, StoreError> {
        let id = id_to_sql(query_id)?;
        self.select_records("WHERE \"queryId\" = ?1", params![id])?
            .pop()
            .ok_or(StoreError::NotFound(query_id))
    }

    fn next_id(&self) -> Result<QueryId, StoreError> {
        let latest =
            self.select_id(&format!("SELECT MAX(\"queryId\") FROM {RECORD_TABLE}"), params![])?;
        match latest {
            None => Ok(QueryId::ZERO),
            Some(last) => last
                .next()
                .ok_or_else(|| StoreError::Invalid("query id space exhausted".to_string())),
        }
    }
}

impl CatalogIndex for SqliteQueryStore {
    fn latest_by_relation_key(&self, key: &RelationKey) -> Result<Option<QueryRecord>, StoreError> {
        let records = self.select_records(
            "WHERE \"userName\" = ?1 AND \"programName\" = ?2 AND \"relationName\" = ?3 ORDER BY \
             \"queryId\" DESC LIMIT 1",
            params![key.user_name, key.program_name, key.relation_name],
        )?;
        Ok(records.into_iter().next())
    }

    fn range_by_backend(
        &self,
        backend: Backend,
        min_id: QueryId,
        max_id: QueryId,
    ) -> Result<RangeSelection, StoreError> {
        let min_sql = id_to_sql(min_id)?;
        let max_sql = id_to_sql(max_id)?;
        let records = self.select_records(
            "WHERE \"backend\" = ?1 AND \"queryId\" >= ?2 AND (?3 = 0 OR \"queryId\" <= ?3) ORDER \
             BY \"queryId\"",
            params![backend.as_str(), min_sql, max_sql],
        )?;
        let min = self.select_id(
            &format!(
                "SELECT MIN(\"queryId\") FROM {RECORD_TABLE} WHERE \"backend\" = ?1 AND \
                 \"queryId\" >= ?2"
            ),
            params![backend.as_str(), min_sql],
        )?;
        let max = self.select_id(
            &format!(
                "SELECT MAX(\"queryId\") FROM {RECORD_TABLE} WHERE \"backend\" = ?1 AND (?2 = 0 OR \
                 \"queryId\" <= ?2)"
            ),
            params![backend.as_str(), max_sql],
        )?;
        Ok(RangeSelection {
            min: min.unwrap_or(QueryId::ZERO),
            max: max.unwrap_or(QueryId::ZERO),
            records,
        })
    }

    fn all_by_backend(&self, backend: Backend) -> Result<Vec<QueryRecord>, StoreError> {
        let filter = "WHERE \"backend\" = ?1 ORDER BY \"queryId\"";
        Ok(self.select_records(filter, params![backend.as_str()])?)
    }

    fn latest_query_id(&self) -> Result<QueryId, StoreError> {
        let latest =
            self.select_id(&format!("SELECT MAX(\"queryId\") FROM {RECORD_TABLE}"), params![])?;
        Ok(latest.unwrap_or(QueryId::ZERO))
    }
}

// ============================================================================//
// SECTION: Row Decoding
// ============================================================================//

/// Column values as stored, before label parsing.
struct RawRecord {
    /// `userName` column.
    user_name: String,
    /// `programName` column.
    program_name: String,
    /// `relationName` column.
    relation_name: String,
    /// `queryId` column.
    query_id: i64,
    /// `created` column.
    created: i64,
    /// `url` column.
    url: String,
    /// `status` column.
    status: String,
    /// `startTime` column.
    start_time: i64,
    /// `endTime` column.
    end_time: Option<i64>,
    /// `elapsed` column.
    elapsed: i64,
    /// `numTuples` column.
    num_tuples: i64,
    /// `schema` column.
    schema: String,
    /// `backend` column.
    backend: String,
    /// `query` column.
    query: String,
    /// `storage` column.
    storage: String,
}

impl RawRecord {
    /// Reads columns in [`RECORD_COLUMNS`] order.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_name: row.get(0)?,
            program_name: row.get(1)?,
            relation_name: row.get(2)?,
            query_id: row.get(3)?,
            created: row.get(4)?,
            url: row.get(5)?,
            status: row.get(6)?,
            start_time: row.get(7)?,
            end_time: row.get(8)?,
            elapsed: row.get(9)?,
            num_tuples: row.get(10)?,
            schema: row.get(11)?,
            backend: row.get(12)?,
            query: row.get(13)?,
            storage: row.get(14)?,
        })
    }

    /// Parses labels and the schema document.
    fn into_record(self) -> Result<QueryRecord, SqliteStoreError> {
        let query_id = id_from_sql(self.query_id)?;
        let corrupt = |err: query_ledger_core::ParseError| {
            SqliteStoreError::Corrupt(format!("query {query_id}: {err}"))
        };
        Ok(QueryRecord {
            relation_key: RelationKey::new(self.user_name, self.program_name, self.relation_name),
            query_id,
            created: Timestamp::from_unix_nanos(self.created),
            url: self.url,
            status: self.status.parse().map_err(corrupt)?,
            start_time: Timestamp::from_unix_nanos(self.start_time),
            end_time: self.end_time.map(Timestamp::from_unix_nanos),
            elapsed_nanos: self.elapsed,
            num_tuples: self.num_tuples,
            schema: ResultSchema::from_json(&self.schema).map_err(corrupt)?,
            backend: self.backend.parse().map_err(corrupt)?,
            query: self.query,
            storage: self.storage.parse().map_err(corrupt)?,
        })
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Returns the quoted, comma-separated record column list.
fn column_list() -> String {
    RECORD_COLUMNS
        .iter()
        .map(|column| format!("\"{}\"", column.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Builds the idempotent DDL for the record table and its indexes.
fn record_table_ddl() -> String {
    let columns = RECORD_COLUMNS
        .iter()
        .map(|column| format!("\"{}\" {}", column.name, column.sql_type))
        .collect::<Vec<_>>()
        .join(",\n    ");
    format!(
        "CREATE TABLE IF NOT EXISTS {RECORD_TABLE} (\n    {columns},\n    PRIMARY KEY \
         (\"queryId\")\n);\nCREATE INDEX IF NOT EXISTS idx_{RECORD_TABLE}_relation ON \
         {RECORD_TABLE} (\"userName\", \"programName\", \"relationName\", \"queryId\");\nCREATE \
         INDEX IF NOT EXISTS idx_{RECORD_TABLE}_backend ON {RECORD_TABLE} (\"backend\", \
         \"queryId\");"
    )
}

/// Converts an id to its `SQLite` integer form.
fn id_to_sql(query_id: QueryId) -> Result<i64, SqliteStoreError> {
    i64::try_from(query_id.get())
        .map_err(|_| SqliteStoreError::Invalid(format!("query id {query_id} exceeds sqlite range")))
}

/// Converts a stored integer back to an id.
fn id_from_sql(value: i64) -> Result<QueryId, SqliteStoreError> {
    u64::try_from(value)
        .map(QueryId::new)
        .map_err(|_| SqliteStoreError::Corrupt(format!("negative query id {value}")))
}

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
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
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

/// Opens an `SQLite` connection with the configured pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags).map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(db_error)?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(db_error)?;
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms)).map_err(db_error)?;
    Ok(connection)
}

/// Records the schema version on first open and rejects other versions.
fn initialize_meta(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(db_error)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(db_error)?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(db_error)?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(db_error)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(db_error)
}
