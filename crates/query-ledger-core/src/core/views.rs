// query-ledger-core/src/core/views.rs
// ============================================================================
// Module: Query Ledger Views
// Description: Caller-facing documents assembled from query records.
// Purpose: Fix the JSON shapes returned by catalog and status operations.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Views are read-only projections of [`QueryRecord`] values. Field names
//! follow the camelCase wire form consumed by the network-facing service.
//! Timestamps are rendered as RFC 3339 strings; finish times stay `null`
//! until a record reaches a terminal state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;

use crate::core::identifiers::QueryId;
use crate::core::identifiers::RelationKey;
use crate::core::record::Backend;
use crate::core::record::QueryRecord;
use crate::core::record::QueryStatus;
use crate::core::record::ResultSchema;
use crate::core::record::StorageFormat;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Status Report
// ============================================================================

/// Execution status of a single query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Lifecycle state.
    pub status: QueryStatus,
    /// Query identifier.
    pub query_id: QueryId,
    /// Result location hint.
    pub url: String,
    /// Execution start.
    pub start_time: String,
    /// Execution end, present once terminal.
    pub finish_time: Option<String>,
    /// Elapsed nanoseconds (live for non-terminal records).
    pub elapsed_nanos: i64,
    /// Profiling modes enabled for the run (always empty).
    pub profiling_mode: Vec<String>,
}

impl StatusReport {
    /// Builds a status report observed at `now`.
    #[must_use]
    pub fn from_record(record: &QueryRecord, now: Timestamp) -> Self {
        Self {
            status: record.status,
            query_id: record.query_id,
            url: record.url.clone(),
            start_time: record.start_time.to_rfc3339(),
            finish_time: record.end_time.map(Timestamp::to_rfc3339),
            elapsed_nanos: record.elapsed_at(now),
            profiling_mode: Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Catalog Entry
// ============================================================================

/// Latest known dataset for a relation key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Relation key.
    pub relation_key: RelationKey,
    /// Query that produced the dataset.
    pub query_id: QueryId,
    /// Record creation time.
    pub created: String,
    /// Result location hint.
    pub url: String,
    /// Tuple count.
    pub num_tuples: i64,
    /// Result encoding.
    pub storage: StorageFormat,
    /// Column names.
    pub col_names: Vec<String>,
    /// Column types.
    pub col_types: Vec<String>,
}

impl From<&QueryRecord> for CatalogEntry {
    fn from(record: &QueryRecord) -> Self {
        Self {
            relation_key: record.relation_key.clone(),
            query_id: record.query_id,
            created: record.created.to_rfc3339(),
            url: record.url.clone(),
            num_tuples: record.num_tuples,
            storage: record.storage,
            col_names: record.schema.column_names.clone(),
            col_types: record.schema.column_types.clone(),
        }
    }
}

// ============================================================================
// SECTION: Query Rows
// ============================================================================

/// Full listing of a query record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRow {
    /// Relation key.
    pub relation_key: RelationKey,
    /// Query identifier.
    pub query_id: QueryId,
    /// Record creation time.
    pub created: String,
    /// Result location hint.
    pub uri: String,
    /// Lifecycle state.
    pub status: QueryStatus,
    /// Execution start.
    pub start_time: String,
    /// Execution end, present once terminal.
    pub finish_time: Option<String>,
    /// Elapsed nanoseconds (live for non-terminal records).
    pub elapsed_nanos: i64,
    /// Tuple count.
    pub num_tuples: i64,
    /// Result schema.
    pub schema: ResultSchema,
    /// Backend label.
    pub backend: Backend,
    /// Result encoding.
    pub storage: StorageFormat,
    /// Raw query text.
    pub raw_query: String,
}

impl QueryRow {
    /// Builds a row observed at `now`.
    #[must_use]
    pub fn from_record(record: &QueryRecord, now: Timestamp) -> Self {
        Self {
            relation_key: record.relation_key.clone(),
            query_id: record.query_id,
            created: record.created.to_rfc3339(),
            uri: record.url.clone(),
            status: record.status,
            start_time: record.start_time.to_rfc3339(),
            finish_time: record.end_time.map(Timestamp::to_rfc3339),
            elapsed_nanos: record.elapsed_at(now),
            num_tuples: record.num_tuples,
            schema: record.schema.clone(),
            backend: record.backend,
            storage: record.storage,
            raw_query: record.query.clone(),
        }
    }
}

/// Records of one backend within an id window, plus pagination bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RangeView {
    /// Smallest matching id at or above the requested minimum (0 if none).
    pub min: QueryId,
    /// Largest matching id at or below the requested maximum (0 if none).
    pub max: QueryId,
    /// Matching rows in id order.
    pub results: Vec<QueryRow>,
}

/// Tuple count of the latest dataset for a relation key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TupleCount {
    /// Tuple count.
    pub num_tuples: i64,
}
