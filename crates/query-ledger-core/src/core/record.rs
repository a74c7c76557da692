// query-ledger-core/src/core/record.rs
// ============================================================================
// Module: Query Ledger Record Model
// Description: Query record fields, status state machine, and schema layout.
// Purpose: Define the single persisted entity and its transition rules.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! A [`QueryRecord`] is the one logical row tracked per submitted query. Its
//! [`QueryStatus`] only moves forward (`ACCEPTED -> RUNNING -> SUCCESS|ERROR`)
//! and the rule is defined here so every store enforces the same machine.
//! [`RECORD_COLUMNS`] is the fixed, ordered schema used to create the backing
//! table.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::ParseError;
use crate::core::identifiers::QueryId;
use crate::core::identifiers::RelationKey;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Schema Definition
// ============================================================================

/// Name of the table holding query records.
pub const RECORD_TABLE: &str = "dataset";

/// Column definition for the query record table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    /// Column name.
    pub name: &'static str,
    /// SQL column type.
    pub sql_type: &'static str,
}

/// Ordered column layout of the query record table.
///
/// # Invariants
/// - `queryId` is the primary key.
/// - Order matches the field order of [`QueryRecord`].
pub const RECORD_COLUMNS: [ColumnDef; 15] = [
    ColumnDef { name: "userName", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "programName", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "relationName", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "queryId", sql_type: "INTEGER NOT NULL" },
    ColumnDef { name: "created", sql_type: "INTEGER NOT NULL" },
    ColumnDef { name: "url", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "status", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "startTime", sql_type: "INTEGER NOT NULL" },
    ColumnDef { name: "endTime", sql_type: "INTEGER" },
    ColumnDef { name: "elapsed", sql_type: "INTEGER NOT NULL" },
    ColumnDef { name: "numTuples", sql_type: "INTEGER NOT NULL" },
    ColumnDef { name: "schema", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "backend", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "query", sql_type: "TEXT NOT NULL" },
    ColumnDef { name: "storage", sql_type: "TEXT NOT NULL" },
];

// ============================================================================
// SECTION: Status
// ============================================================================

/// Lifecycle state of a query record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    /// Recorded but not yet handed to a backend.
    Accepted,
    /// Backend execution in progress.
    Running,
    /// Backend finished and result artifacts were read.
    Success,
    /// Execution or artifact collection failed.
    Error,
}

impl QueryStatus {
    /// Returns the canonical label stored for the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Running => "RUNNING",
            Self::Success => "SUCCESS",
            Self::Error => "ERROR",
        }
    }

    /// Returns true for `SUCCESS` and `ERROR`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Error)
    }

    /// Returns true when moving from `self` to `next` is a legal transition.
    ///
    /// `ACCEPTED` may fail directly when delegation breaks before execution.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Accepted, Self::Running | Self::Error)
                | (Self::Running, Self::Success | Self::Error)
        )
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryStatus {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ACCEPTED" => Ok(Self::Accepted),
            "RUNNING" => Ok(Self::Running),
            "SUCCESS" => Ok(Self::Success),
            "ERROR" => Ok(Self::Error),
            other => Err(ParseError::UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Backend and Storage
// ============================================================================

/// Result encoding written by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageFormat {
    /// One text line per tuple.
    #[serde(rename = "row_ascii")]
    RowAscii,
    /// Flat little-endian 8-byte signed integers.
    #[serde(rename = "binary")]
    Binary,
}

impl StorageFormat {
    /// Returns the canonical storage label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RowAscii => "row_ascii",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for StorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageFormat {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "row_ascii" => Ok(Self::RowAscii),
            "binary" => Ok(Self::Binary),
            other => Err(ParseError::UnknownStorage(other.to_string())),
        }
    }
}

/// Execution backend that ran a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Engine emitting line-oriented text results.
    AsciiEngine,
    /// Engine emitting fixed-width binary tuples.
    BinaryEngine,
}

impl Backend {
    /// All known backends.
    pub const ALL: [Self; 2] = [Self::AsciiEngine, Self::BinaryEngine];

    /// Returns the canonical backend label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AsciiEngine => "ascii-engine",
            Self::BinaryEngine => "binary-engine",
        }
    }

    /// Returns the storage encoding produced by the backend.
    #[must_use]
    pub const fn storage(self) -> StorageFormat {
        match self {
            Self::AsciiEngine => StorageFormat::RowAscii,
            Self::BinaryEngine => StorageFormat::Binary,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.as_str() == value)
            .ok_or_else(|| ParseError::UnknownBackend(value.to_string()))
    }
}

// ============================================================================
// SECTION: Result Schema
// ============================================================================

/// Column names and types discovered after execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSchema {
    /// Ordered column names.
    pub column_names: Vec<String>,
    /// Ordered column types.
    pub column_types: Vec<String>,
}

impl ResultSchema {
    /// Creates a schema from names and types.
    #[must_use]
    pub const fn new(column_names: Vec<String>, column_types: Vec<String>) -> Self {
        Self {
            column_names,
            column_types,
        }
    }

    /// Returns the placeholder schema stored before execution.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Returns the number of columns (derived from the names).
    #[must_use]
    pub const fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Returns true when no columns are known.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.column_names.is_empty()
    }

    /// Serializes the schema to its persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidSchema`] when serialization fails.
    pub fn to_json(&self) -> Result<String, ParseError> {
        serde_json::to_string(self).map_err(|err| ParseError::InvalidSchema(err.to_string()))
    }

    /// Parses the persisted JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidSchema`] when the document is malformed.
    pub fn from_json(value: &str) -> Result<Self, ParseError> {
        serde_json::from_str(value).map_err(|err| ParseError::InvalidSchema(err.to_string()))
    }

    /// Parses a backend schema artifact: a line of column names followed by a
    /// line of column types.
    ///
    /// Each line is a bracketed list, either a JSON array or a list literal
    /// with single-quoted items (`['a', 'b']`).
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidSchema`] when a line is missing or
    /// malformed, or when the two lists differ in length.
    pub fn parse_artifact(text: &str) -> Result<Self, ParseError> {
        let mut lines = text.split('\n');
        let names = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| ParseError::InvalidSchema("missing column name line".to_string()))?;
        let types = lines
            .next()
            .filter(|line| !line.trim().is_empty())
            .ok_or_else(|| ParseError::InvalidSchema("missing column type line".to_string()))?;
        let column_names = parse_column_list(names)?;
        let column_types = parse_column_list(types)?;
        if column_names.len() != column_types.len() {
            return Err(ParseError::InvalidSchema(format!(
                "{} column names but {} column types",
                column_names.len(),
                column_types.len()
            )));
        }
        Ok(Self::new(column_names, column_types))
    }
}

/// Parses a bracketed list of quoted strings.
fn parse_column_list(line: &str) -> Result<Vec<String>, ParseError> {
    let trimmed = line.trim();
    if let Ok(values) = serde_json::from_str::<Vec<String>>(trimmed) {
        return Ok(values);
    }
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .ok_or_else(|| ParseError::InvalidSchema(format!("expected bracketed list: {trimmed}")))?;
    let mut values = Vec::new();
    let mut chars = inner.chars().peekable();
    loop {
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        let Some(quote) = chars.next() else {
            break;
        };
        if quote != '\'' && quote != '"' {
            return Err(ParseError::InvalidSchema(format!("expected quoted item in {trimmed}")));
        }
        let mut value = String::new();
        let mut closed = false;
        while let Some(ch) = chars.next() {
            match ch {
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| {
                        ParseError::InvalidSchema(format!("dangling escape in {trimmed}"))
                    })?;
                    value.push(escaped);
                }
                ch if ch == quote => {
                    closed = true;
                    break;
                }
                ch => value.push(ch),
            }
        }
        if !closed {
            return Err(ParseError::InvalidSchema(format!("unterminated item in {trimmed}")));
        }
        values.push(value);
        while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(other) => {
                return Err(ParseError::InvalidSchema(format!(
                    "unexpected '{other}' in {trimmed}"
                )));
            }
        }
    }
    Ok(values)
}

// ============================================================================
// SECTION: Query Record
// ============================================================================

/// Persisted metadata for one submitted query.
///
/// # Invariants
/// - `schema` is populated only once `status` reaches `SUCCESS`.
/// - `end_time` and `elapsed_nanos` are meaningful only in terminal states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    /// Relation key targeted by the query.
    pub relation_key: RelationKey,
    /// Store-assigned identifier.
    pub query_id: QueryId,
    /// Insertion time.
    pub created: Timestamp,
    /// Client-supplied result location hint.
    pub url: String,
    /// Lifecycle state.
    pub status: QueryStatus,
    /// Execution start.
    pub start_time: Timestamp,
    /// Execution end, set on reaching a terminal state.
    pub end_time: Option<Timestamp>,
    /// `end_time - start_time` in nanoseconds, stored at terminal state.
    pub elapsed_nanos: i64,
    /// Result row count; authoritative only at `SUCCESS`.
    pub num_tuples: i64,
    /// Result schema; empty until `SUCCESS`.
    pub schema: ResultSchema,
    /// Backend that runs the query.
    pub backend: Backend,
    /// Raw query text.
    pub query: String,
    /// Result encoding used by the decoder.
    pub storage: StorageFormat,
}

impl QueryRecord {
    /// Returns the elapsed execution time as observed at `now`.
    ///
    /// Terminal records report the stored duration; others report
    /// `now - start_time`.
    #[must_use]
    pub const fn elapsed_at(&self, now: Timestamp) -> i64 {
        if self.end_time.is_some() { self.elapsed_nanos } else { now.nanos_since(self.start_time) }
    }
}

// ============================================================================
// SECTION: Record Updates
// ============================================================================

/// Partial update applied atomically to a stored record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    /// New lifecycle state.
    pub status: Option<QueryStatus>,
    /// New end time.
    pub end_time: Option<Timestamp>,
    /// New stored elapsed duration.
    pub elapsed_nanos: Option<i64>,
    /// New tuple count.
    pub num_tuples: Option<i64>,
    /// New result schema.
    pub schema: Option<ResultSchema>,
}

impl RecordUpdate {
    /// Creates an update that only changes the status.
    #[must_use]
    pub fn status(status: QueryStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Creates an update that moves the record to a terminal state and stamps
    /// its end time and elapsed duration.
    #[must_use]
    pub fn finish(status: QueryStatus, start_time: Timestamp, end_time: Timestamp) -> Self {
        Self {
            status: Some(status),
            end_time: Some(end_time),
            elapsed_nanos: Some(end_time.nanos_since(start_time)),
            ..Self::default()
        }
    }

    /// Returns true when no field would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.end_time.is_none()
            && self.elapsed_nanos.is_none()
            && self.num_tuples.is_none()
            && self.schema.is_none()
    }

    /// Applies the update to an in-memory record.
    pub fn apply_to(&self, record: &mut QueryRecord) {
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(end_time) = self.end_time {
            record.end_time = Some(end_time);
        }
        if let Some(elapsed) = self.elapsed_nanos {
            record.elapsed_nanos = elapsed;
        }
        if let Some(num_tuples) = self.num_tuples {
            record.num_tuples = num_tuples;
        }
        if let Some(schema) = &self.schema {
            record.schema = schema.clone();
        }
    }
}
