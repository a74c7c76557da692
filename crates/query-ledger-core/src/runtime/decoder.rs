// query-ledger-core/src/runtime/decoder.rs
// ============================================================================
// Module: Query Ledger Result Decoder
// Description: Uniform tuple streams over text and binary result artifacts.
// Purpose: Materialize a finished query's output independent of its backend.
// Dependencies: crate::{core, interfaces, runtime}, serde, thiserror
// ============================================================================

//! ## Overview
//! A `SUCCESS` record's raw output is decoded lazily into tuple strings:
//! - `row_ascii`: every non-empty line is one tuple, emitted verbatim.
//! - `binary`: flat little-endian `i64` words grouped by the schema's column
//!   count and joined by single spaces.
//!
//! The binary file length is checked against the column width before the
//! first tuple is produced, and a short trailing group still fails while
//! streaming if the file changes underneath. File handles live inside the
//! [`TupleStream`] and are released when it is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::core::QueryId;
use crate::core::QueryRecord;
use crate::core::QueryStatus;
use crate::core::ResultSchema;
use crate::core::StorageFormat;
use crate::interfaces::QueryRecordStore;
use crate::interfaces::StoreError;
use crate::runtime::engine::EngineSet;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Width of one binary value in bytes.
pub const BINARY_WORD_BYTES: usize = 8;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while materializing results.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The record has not reached `SUCCESS`.
    #[error("query {query_id} has status {status}, results need SUCCESS")]
    NotSucceeded {
        /// Record identifier.
        query_id: QueryId,
        /// Current status.
        status: QueryStatus,
    },
    /// The raw output artifact does not exist.
    #[error("result artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),
    /// A binary result needs a column count but the schema is empty.
    #[error("query {0} has no schema to size binary tuples")]
    SchemaUnavailable(QueryId),
    /// The artifact content does not match its encoding.
    #[error("result decode error: {0}")]
    Decode(String),
    /// The artifact could not be read.
    #[error("result io error: {0}")]
    Io(String),
    /// The record could not be loaded.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// SECTION: Result Elements
// ============================================================================

/// One element of a materialized result: the schema first, then tuples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ResultElement {
    /// Leading schema element.
    Schema(ResultSchema),
    /// One tuple rendered as text.
    Tuple {
        /// Tuple text.
        tuple: String,
    },
}

/// Schema plus a lazy tuple stream for one query.
#[derive(Debug)]
pub struct DecodedResult {
    /// Stored result schema.
    pub schema: ResultSchema,
    /// Tuples in file order.
    pub tuples: TupleStream,
}

impl DecodedResult {
    /// Drains the stream into the schema-first element list.
    ///
    /// # Errors
    ///
    /// Returns the first [`DecodeError`] raised by the stream.
    pub fn into_elements(self) -> Result<Vec<ResultElement>, DecodeError> {
        let mut elements = vec![ResultElement::Schema(self.schema)];
        for tuple in self.tuples {
            elements.push(ResultElement::Tuple {
                tuple: tuple?,
            });
        }
        Ok(elements)
    }
}

// ============================================================================
// SECTION: Tuple Stream
// ============================================================================

/// Encoding read by a [`TupleStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    /// Newline-separated text tuples.
    Text,
    /// Fixed-width integers, `columns` per tuple.
    Binary {
        /// Values per tuple.
        columns: usize,
    },
}

/// Lazy, finite iterator over the tuples of one artifact.
///
/// The stream stops after the first error.
#[derive(Debug)]
pub struct TupleStream {
    /// Buffered artifact handle.
    reader: BufReader<File>,
    /// Artifact encoding.
    kind: StreamKind,
    /// Set once the stream is exhausted or failed.
    done: bool,
}

impl TupleStream {
    /// Opens a text artifact.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ArtifactNotFound`] when the file is missing.
    pub fn open_text(path: &Path) -> Result<Self, DecodeError> {
        let file = open_artifact(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            kind: StreamKind::Text,
            done: false,
        })
    }

    /// Opens a binary artifact holding `columns` values per tuple.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::ArtifactNotFound`] when the file is missing and
    /// [`DecodeError::Decode`] when `columns` is zero or the file length is
    /// not a whole number of tuples.
    pub fn open_binary(path: &Path, columns: usize) -> Result<Self, DecodeError> {
        if columns == 0 {
            return Err(DecodeError::Decode("binary tuples need at least one column".to_string()));
        }
        let file = open_artifact(path)?;
        let len = file.metadata().map_err(|err| DecodeError::Io(err.to_string()))?.len();
        let tuple_bytes = u64::try_from(columns.saturating_mul(BINARY_WORD_BYTES))
            .map_err(|_| DecodeError::Decode("column count too large".to_string()))?;
        if len % tuple_bytes != 0 {
            return Err(DecodeError::Decode(format!(
                "binary result of {len} bytes is not a multiple of {tuple_bytes}-byte tuples"
            )));
        }
        Ok(Self {
            reader: BufReader::new(file),
            kind: StreamKind::Binary {
                columns,
            },
            done: false,
        })
    }

    /// Reads the next non-empty text line.
    fn next_text(&mut self) -> Result<Option<String>, DecodeError> {
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut line)
                .map_err(|err| DecodeError::Io(err.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            if !line.is_empty() {
                return String::from_utf8(line)
                    .map(Some)
                    .map_err(|_| DecodeError::Decode("text tuple is not utf-8".to_string()));
            }
        }
    }

    /// Reads the next group of `columns` integers.
    fn next_binary(&mut self, columns: usize) -> Result<Option<String>, DecodeError> {
        let Some(first) = self.read_word()? else {
            return Ok(None);
        };
        let mut values = Vec::with_capacity(columns);
        values.push(first.to_string());
        for _ in 1 .. columns {
            let value = self.read_word()?.ok_or_else(|| {
                DecodeError::Decode(format!("trailing partial tuple: expected {columns} values"))
            })?;
            values.push(value.to_string());
        }
        Ok(Some(values.join(" ")))
    }

    /// Reads one little-endian word; `None` on a clean end of file.
    fn read_word(&mut self) -> Result<Option<i64>, DecodeError> {
        let mut word = [0_u8; BINARY_WORD_BYTES];
        let mut filled = 0;
        while filled < BINARY_WORD_BYTES {
            match self.reader.read(&mut word[filled ..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(err) if err.kind() == ErrorKind::Interrupted => {}
                Err(err) => return Err(DecodeError::Io(err.to_string())),
            }
        }
        match filled {
            0 => Ok(None),
            BINARY_WORD_BYTES => Ok(Some(i64::from_le_bytes(word))),
            partial => {
                Err(DecodeError::Decode(format!("trailing partial value of {partial} bytes")))
            }
        }
    }
}

impl Iterator for TupleStream {
    type Item = Result<String, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let next = match self.kind {
            StreamKind::Text => self.next_text(),
            StreamKind::Binary {
                columns,
            } => self.next_binary(columns),
        };
        match next {
            Ok(Some(tuple)) => Some(Ok(tuple)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

// ============================================================================
// SECTION: Decoder
// ============================================================================

/// Materializes results of finished queries.
pub struct ResultDecoder<S> {
    /// Record store.
    store: S,
    /// Artifact strategies per backend.
    engines: EngineSet,
}

impl<S: QueryRecordStore> ResultDecoder<S> {
    /// Creates a decoder over `store`.
    #[must_use]
    pub const fn new(store: S, engines: EngineSet) -> Self {
        Self {
            store,
            engines,
        }
    }

    /// Loads the record and opens its result stream.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the record is missing, not `SUCCESS`, or
    /// its artifact cannot be opened.
    pub fn decode(&self, query_id: QueryId) -> Result<DecodedResult, DecodeError> {
        let record = self.store.get(query_id)?;
        self.decode_record(&record)
    }

    /// Opens the result stream of an already loaded record.
    ///
    /// The artifact name is the record's relation name.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when the record is not `SUCCESS` or its
    /// artifact cannot be opened.
    pub fn decode_record(&self, record: &QueryRecord) -> Result<DecodedResult, DecodeError> {
        if record.status != QueryStatus::Success {
            return Err(DecodeError::NotSucceeded {
                query_id: record.query_id,
                status: record.status,
            });
        }
        let path = self
            .engines
            .strategy(record.backend)
            .raw_output_artifact(&record.relation_key.relation_name);
        let tuples = match record.storage {
            StorageFormat::RowAscii => TupleStream::open_text(&path)?,
            StorageFormat::Binary => {
                if record.schema.is_empty() {
                    return Err(DecodeError::SchemaUnavailable(record.query_id));
                }
                TupleStream::open_binary(&path, record.schema.column_count())?
            }
        };
        Ok(DecodedResult {
            schema: record.schema.clone(),
            tuples,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Opens an artifact, mapping a missing file to its own error.
fn open_artifact(path: &Path) -> Result<File, DecodeError> {
    File::open(path).map_err(|err| {
        if err.kind() == ErrorKind::NotFound {
            DecodeError::ArtifactNotFound(path.to_path_buf())
        } else {
            DecodeError::Io(err.to_string())
        }
    })
}
