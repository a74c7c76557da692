// query-ledger-core/src/interfaces/mod.rs
// ============================================================================
// Module: Query Ledger Interfaces
// Description: Backend-agnostic interfaces for storage, execution, and audit.
// Purpose: Define the contract surfaces used by the Query Ledger runtime.
// Dependencies: crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the ledger integrates with persistence, backend
//! execution, clocks, and audit logging without embedding any of them.
//! Implementations must fail closed: missing records are errors, never
//! silently defaulted values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::core::Backend;
use crate::core::QueryId;
use crate::core::QueryRecord;
use crate::core::QueryStatus;
use crate::core::RecordUpdate;
use crate::core::RelationKey;
use crate::core::Timestamp;

// ============================================================================
// SECTION: Record Store
// ============================================================================

/// Record store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the identifier.
    #[error("query {0} not found")]
    NotFound(QueryId),
    /// No record exists for the relation key.
    #[error("no query recorded for relation {0}")]
    RelationNotFound(RelationKey),
    /// A record with the identifier already exists.
    #[error("query {0} already exists")]
    DuplicateKey(QueryId),
    /// The update would violate the status state machine.
    #[error("query {query_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Record identifier.
        query_id: QueryId,
        /// Current status.
        from: QueryStatus,
        /// Requested status.
        to: QueryStatus,
    },
    /// Store I/O error.
    #[error("query store io error: {0}")]
    Io(String),
    /// Stored data is corrupted or unparsable.
    #[error("query store corruption: {0}")]
    Corrupt(String),
    /// Stored data version is incompatible.
    #[error("query store version mismatch: {0}")]
    VersionMismatch(String),
    /// Input data is invalid.
    #[error("query store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("query store error: {0}")]
    Store(String),
}

/// CRUD persistence for query records.
pub trait QueryRecordStore {
    /// Creates the backing table when absent; no-op otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the table cannot be created.
    fn create_table(&self) -> Result<(), StoreError>;

    /// Persists a new record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateKey`] when the id is already used.
    fn insert(&self, record: &QueryRecord) -> Result<(), StoreError>;

    /// Applies a partial update atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the record is absent and
    /// [`StoreError::InvalidTransition`] when the status change is illegal.
    fn update(&self, query_id: QueryId, update: &RecordUpdate) -> Result<(), StoreError>;

    /// Loads a record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the record is absent.
    fn get(&self, query_id: QueryId) -> Result<QueryRecord, StoreError>;

    /// Returns `max(queryId) + 1`, or 0 when empty, computed on every call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn next_id(&self) -> Result<QueryId, StoreError>;
}

// ============================================================================
// SECTION: Catalog Index
// ============================================================================

/// Records of one backend within an id window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSelection {
    /// Smallest id of the backend at or above the minimum (0 if none).
    pub min: QueryId,
    /// Largest id of the backend at or below the maximum, or the overall
    /// maximum when unbounded (0 if none).
    pub max: QueryId,
    /// Matching records in ascending id order.
    pub records: Vec<QueryRecord>,
}

/// Read-only lookups over the record store.
pub trait CatalogIndex {
    /// Returns the highest-id record for the relation key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn latest_by_relation_key(&self, key: &RelationKey) -> Result<Option<QueryRecord>, StoreError>;

    /// Returns records of `backend` with ids in `[min_id, max_id]`.
    ///
    /// A `max_id` of zero means no upper bound.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn range_by_backend(
        &self,
        backend: Backend,
        min_id: QueryId,
        max_id: QueryId,
    ) -> Result<RangeSelection, StoreError>;

    /// Returns every record of `backend` in ascending id order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn all_by_backend(&self, backend: Backend) -> Result<Vec<QueryRecord>, StoreError>;

    /// Returns the highest id in the store, or 0 when empty.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn latest_query_id(&self) -> Result<QueryId, StoreError>;
}

// ============================================================================
// SECTION: Execution Runner
// ============================================================================

/// Output of a finished backend run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Process exit code; `None` when terminated by a signal.
    pub exit_code: Option<i32>,
    /// Combined process output.
    pub output: Vec<u8>,
}

impl RunOutput {
    /// Returns true when the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.exit_code, Some(0))
    }
}

/// Runner errors raised before a backend produced an exit status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunnerError {
    /// The backend process could not be started.
    #[error("backend spawn failed: {0}")]
    Spawn(String),
    /// I/O failed while waiting on the backend.
    #[error("backend io error: {0}")]
    Io(String),
}

/// External executor for backend queries.
pub trait ExecutionRunner {
    /// Runs `artifact` on `backend` and blocks until the process exits.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError`] when the process cannot be run at all.
    fn run(&self, backend: Backend, artifact: &str) -> Result<RunOutput, RunnerError>;
}

// ============================================================================
// SECTION: Clock
// ============================================================================

/// Source of wall-clock time for record timestamps.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> Timestamp;
}

// ============================================================================
// SECTION: Audit
// ============================================================================

/// Lifecycle audit event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleEvent {
    /// Event identifier.
    pub event: &'static str,
    /// Event timestamp (nanoseconds since epoch).
    pub timestamp_ns: i64,
    /// Query identifier.
    pub query_id: QueryId,
    /// Backend when known.
    pub backend: Option<Backend>,
    /// Status after the event.
    pub status: QueryStatus,
    /// Tuple count on success.
    pub num_tuples: Option<i64>,
    /// Failure detail on error.
    pub detail: Option<String>,
}

impl LifecycleEvent {
    /// Event for a newly accepted query.
    #[must_use]
    pub const fn submitted(record: &QueryRecord) -> Self {
        Self {
            event: "query_submitted",
            timestamp_ns: record.created.as_unix_nanos(),
            query_id: record.query_id,
            backend: Some(record.backend),
            status: QueryStatus::Accepted,
            num_tuples: None,
            detail: None,
        }
    }

    /// Event for a query handed to its backend.
    #[must_use]
    pub const fn running(query_id: QueryId, backend: Backend, at: Timestamp) -> Self {
        Self {
            event: "query_running",
            timestamp_ns: at.as_unix_nanos(),
            query_id,
            backend: Some(backend),
            status: QueryStatus::Running,
            num_tuples: None,
            detail: None,
        }
    }

    /// Event for a query that reached `SUCCESS`.
    #[must_use]
    pub const fn succeeded(query_id: QueryId, num_tuples: i64, at: Timestamp) -> Self {
        Self {
            event: "query_succeeded",
            timestamp_ns: at.as_unix_nanos(),
            query_id,
            backend: None,
            status: QueryStatus::Success,
            num_tuples: Some(num_tuples),
            detail: None,
        }
    }

    /// Event for a query that reached `ERROR`.
    #[must_use]
    pub fn failed(query_id: QueryId, detail: impl Into<String>, at: Timestamp) -> Self {
        Self {
            event: "query_failed",
            timestamp_ns: at.as_unix_nanos(),
            query_id,
            backend: None,
            status: QueryStatus::Error,
            num_tuples: None,
            detail: Some(detail.into()),
        }
    }
}

/// Audit sink for lifecycle events.
pub trait LifecycleAuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: &LifecycleEvent);
}
