// query-ledger-core/src/runtime/import.rs
// ============================================================================
// Module: Query Ledger Bulk Import
// Description: CSV import of pre-existing datasets as finished records.
// Purpose: Register datasets produced outside the ledger.
// Dependencies: crate::{core, interfaces}, csv, thiserror
// ============================================================================

//! ## Overview
//! Each CSV row (no header) describes one dataset:
//! `user, program, relation, url, numTuples, backend, numColumns, storage`,
//! followed by `numColumns` column names and `numColumns` column types.
//! Every row becomes a `SUCCESS` record with the next free id and zero
//! elapsed time. Rows are written one at a time; a malformed row stops the
//! import and earlier rows stay recorded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use csv::ReaderBuilder;
use csv::StringRecord;
use thiserror::Error;

use crate::core::Backend;
use crate::core::ParseError;
use crate::core::QueryId;
use crate::core::QueryRecord;
use crate::core::QueryStatus;
use crate::core::RelationKey;
use crate::core::ResultSchema;
use crate::core::StorageFormat;
use crate::core::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::QueryRecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Query text stored for imported datasets.
pub const IMPORTED_QUERY_TEXT: &str = "Insert dataset";
/// Number of fixed fields before the column lists.
const FIXED_FIELDS: usize = 8;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised during bulk import. Row numbers start at 1.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The import file could not be opened.
    #[error("import io error: {0}")]
    Io(String),
    /// The CSV stream is malformed.
    #[error("csv error at row {row}: {message}")]
    Csv {
        /// Row number.
        row: usize,
        /// Parser message.
        message: String,
    },
    /// A row does not describe a valid dataset.
    #[error("invalid import row {row}: {message}")]
    InvalidRow {
        /// Row number.
        row: usize,
        /// Reason the row was rejected.
        message: String,
    },
    /// The record could not be stored.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Identifiers assigned to imported rows, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Assigned query ids.
    pub imported: Vec<QueryId>,
}

// ============================================================================
// SECTION: Importer
// ============================================================================

/// Imports dataset descriptions as `SUCCESS` records.
pub struct BulkImporter<S, C> {
    /// Record store.
    store: S,
    /// Time source for record timestamps.
    clock: C,
}

impl<S, C> BulkImporter<S, C>
where
    S: QueryRecordStore,
    C: Clock,
{
    /// Creates an importer.
    #[must_use]
    pub const fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
        }
    }

    /// Imports every row of the CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] when the file cannot be opened or a row fails.
    pub fn import_file(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        let file = File::open(path)
            .map_err(|err| ImportError::Io(format!("{}: {err}", path.display())))?;
        self.import_csv(file)
    }

    /// Imports every row of a CSV stream.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] on the first malformed or unstorable row.
    pub fn import_csv<Rd: Read>(&self, reader: Rd) -> Result<ImportSummary, ImportError> {
        let mut csv = ReaderBuilder::new().has_headers(false).flexible(true).from_reader(reader);
        let mut summary = ImportSummary::default();
        for (index, row) in csv.records().enumerate() {
            let row_number = index + 1;
            let row = row.map_err(|err| ImportError::Csv {
                row: row_number,
                message: err.to_string(),
            })?;
            let query_id = self.store.next_id()?;
            let record = dataset_record(&row, query_id, self.clock.now()).map_err(|message| {
                ImportError::InvalidRow {
                    row: row_number,
                    message,
                }
            })?;
            self.store.insert(&record)?;
            summary.imported.push(query_id);
        }
        Ok(summary)
    }
}

// ============================================================================
// SECTION: Row Parsing
// ============================================================================

/// Builds a finished record from one CSV row.
fn dataset_record(
    row: &StringRecord,
    query_id: QueryId,
    now: Timestamp,
) -> Result<QueryRecord, String> {
    if row.len() < FIXED_FIELDS {
        return Err(format!("expected at least {FIXED_FIELDS} fields, found {}", row.len()));
    }
    let field = |index: usize| row.get(index).unwrap_or_default();
    let relation_key =
        RelationKey::from_parts(field(0), field(1), field(2)).map_err(|err| err.to_string())?;
    let num_tuples: i64 = parse_number(field(4), "tuple count")?;
    if num_tuples < 0 {
        return Err(format!("negative tuple count {num_tuples}"));
    }
    let backend: Backend = field(5).trim().parse().map_err(|err: ParseError| err.to_string())?;
    let columns: usize = parse_number(field(6), "column count")?;
    let storage: StorageFormat =
        field(7).trim().parse().map_err(|err: ParseError| err.to_string())?;
    if storage != backend.storage() {
        return Err(format!("storage {storage} does not match backend {backend}"));
    }
    let expected = FIXED_FIELDS.saturating_add(columns.saturating_mul(2));
    if row.len() != expected {
        return Err(format!(
            "expected {expected} fields for {columns} columns, found {}",
            row.len()
        ));
    }
    let mut column_names: Vec<String> = row.iter().skip(FIXED_FIELDS).map(str::to_string).collect();
    let column_types = column_names.split_off(columns);
    Ok(QueryRecord {
        relation_key,
        query_id,
        created: now,
        url: field(3).to_string(),
        status: QueryStatus::Success,
        start_time: now,
        end_time: Some(now),
        elapsed_nanos: 0,
        num_tuples,
        schema: ResultSchema::new(column_names, column_types),
        backend,
        query: IMPORTED_QUERY_TEXT.to_string(),
        storage,
    })
}

/// Parses a numeric field, naming it in the error.
fn parse_number<T: FromStr>(value: &str, what: &str) -> Result<T, String> {
    value.trim().parse().map_err(|_| format!("invalid {what} '{value}'"))
}
