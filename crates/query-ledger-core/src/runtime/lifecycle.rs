// query-ledger-core/src/runtime/lifecycle.rs
// ============================================================================
// Module: Query Ledger Lifecycle Controller
// Description: Submission, execution delegation, and terminal transitions.
// Purpose: Drive ACCEPTED -> RUNNING -> SUCCESS | ERROR around a backend run.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The lifecycle controller is the only path that changes a record's status.
//! It delegates execution to an [`ExecutionRunner`], then collects the
//! backend's schema and tuple-count artifacts through the matching
//! [`EngineStrategy`](crate::runtime::EngineStrategy).
//!
//! Execution-time failures (runner errors, non-zero exits, missing or
//! malformed artifacts) are absorbed into the `ERROR` state and reported on
//! the audit sink; only structural failures are returned as errors.
//!
//! Security posture: artifact content is untrusted backend output; reads are
//! bounded and parse failures fail closed to `ERROR`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::core::Backend;
use crate::core::QueryId;
use crate::core::QueryRecord;
use crate::core::QueryStatus;
use crate::core::RecordUpdate;
use crate::core::RelationKey;
use crate::core::ResultSchema;
use crate::core::Timestamp;
use crate::interfaces::Clock;
use crate::interfaces::ExecutionRunner;
use crate::interfaces::LifecycleAuditSink;
use crate::interfaces::LifecycleEvent;
use crate::interfaces::QueryRecordStore;
use crate::interfaces::RunnerError;
use crate::interfaces::StoreError;
use crate::runtime::audit::NoopAuditSink;
use crate::runtime::engine::ArtifactError;
use crate::runtime::engine::EngineSet;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of backend output bytes kept in a failure detail.
const MAX_FAILURE_OUTPUT_BYTES: usize = 4096;

// ============================================================================
// SECTION: Requests and Outcomes
// ============================================================================

/// Parameters of a new query submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    /// Relation key the query produces.
    pub relation_key: RelationKey,
    /// Client result location hint.
    pub url: String,
    /// Caller-chosen identifier, normally taken from `next_id`.
    pub query_id: QueryId,
    /// Backend that will run the query.
    pub backend: Backend,
    /// Decoded query text.
    pub raw_query: String,
}

/// Result of delegating a query to its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The record reached `SUCCESS`.
    Succeeded {
        /// Tuple count read from the backend artifacts.
        num_tuples: i64,
    },
    /// The record reached `ERROR`.
    Failed {
        /// Why execution or artifact collection failed.
        failure: ExecutionFailure,
    },
}

/// Execution-time failure absorbed into the `ERROR` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    /// The runner could not execute the backend.
    #[error(transparent)]
    Runner(#[from] RunnerError),
    /// The backend exited unsuccessfully.
    #[error(
        "backend exited with {}",
        .exit_code.map_or_else(|| "no status".to_string(), |code| format!("status {code}"))
    )]
    NonZeroExit {
        /// Exit code, absent when the process was killed by a signal.
        exit_code: Option<i32>,
        /// Leading backend output (lossy UTF-8).
        output: String,
    },
    /// A schema or count artifact was missing or malformed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Structural lifecycle errors returned to callers.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// No record exists for the identifier.
    #[error("query {0} not found")]
    NotFound(QueryId),
    /// The identifier is already in use.
    #[error("query {0} already exists")]
    DuplicateQueryId(QueryId),
    /// The record is not in a state that allows the transition.
    #[error("query {query_id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// Record identifier.
        query_id: QueryId,
        /// Current status.
        from: QueryStatus,
        /// Requested status.
        to: QueryStatus,
    },
    /// Any other store failure.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(query_id) => Self::NotFound(query_id),
            StoreError::DuplicateKey(query_id) => Self::DuplicateQueryId(query_id),
            StoreError::InvalidTransition {
                query_id,
                from,
                to,
            } => Self::InvalidTransition {
                query_id,
                from,
                to,
            },
            other => Self::Store(other),
        }
    }
}

// ============================================================================
// SECTION: Controller
// ============================================================================

/// Drives query records through their lifecycle.
pub struct LifecycleController<S, R, C> {
    /// Record store.
    store: S,
    /// Backend executor.
    runner: R,
    /// Time source for record timestamps.
    clock: C,
    /// Artifact strategies per backend.
    engines: EngineSet,
    /// Audit sink for lifecycle events.
    audit: Arc<dyn LifecycleAuditSink>,
}

impl<S, R, C> LifecycleController<S, R, C>
where
    S: QueryRecordStore,
    R: ExecutionRunner,
    C: Clock,
{
    /// Creates a controller with a no-op audit sink.
    #[must_use]
    pub fn new(store: S, runner: R, clock: C, engines: EngineSet) -> Self {
        Self {
            store,
            runner,
            clock,
            engines,
            audit: Arc::new(NoopAuditSink),
        }
    }

    /// Replaces the audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn LifecycleAuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Returns the underlying record store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Records a new query in the `ACCEPTED` state.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::DuplicateQueryId`] when the id is taken.
    pub fn submit(&self, request: SubmitRequest) -> Result<QueryRecord, LifecycleError> {
        let now = self.clock.now();
        let record = QueryRecord {
            relation_key: request.relation_key,
            query_id: request.query_id,
            created: now,
            url: request.url,
            status: QueryStatus::Accepted,
            start_time: now,
            end_time: None,
            elapsed_nanos: 0,
            num_tuples: 0,
            schema: ResultSchema::empty(),
            backend: request.backend,
            query: request.raw_query,
            storage: request.backend.storage(),
        };
        self.store.insert(&record)?;
        self.audit.record(&LifecycleEvent::submitted(&record));
        Ok(record)
    }

    /// Moves an `ACCEPTED` record to `RUNNING`, runs it, and records the
    /// terminal state.
    ///
    /// The relation name is the artifact name for the run, its side-files,
    /// and the raw output the decoder later reads.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown ids,
    /// [`LifecycleError::InvalidTransition`] when the record is not
    /// `ACCEPTED`, and [`LifecycleError::Store`] when a status write fails.
    /// A failed `SUCCESS` write still moves the record to `ERROR` before the
    /// store error is returned.
    pub fn mark_running(&self, query_id: QueryId) -> Result<RunOutcome, LifecycleError> {
        let record = self.store.get(query_id)?;
        ensure_transition(&record, QueryStatus::Running)?;
        self.store.update(query_id, &RecordUpdate::status(QueryStatus::Running))?;
        self.audit.record(&LifecycleEvent::running(query_id, record.backend, self.clock.now()));

        match self.execute(record.backend, &record.relation_key.relation_name) {
            Ok((schema, num_tuples)) => {
                let end = self.clock.now();
                let update = RecordUpdate {
                    schema: Some(schema),
                    num_tuples: Some(num_tuples),
                    ..RecordUpdate::finish(QueryStatus::Success, record.start_time, end)
                };
                if let Err(err) = self.store.update(query_id, &update) {
                    self.fail(&record, format!("failed to record success: {err}"), end)?;
                    return Err(err.into());
                }
                self.audit.record(&LifecycleEvent::succeeded(query_id, num_tuples, end));
                Ok(RunOutcome::Succeeded {
                    num_tuples,
                })
            }
            Err(failure) => {
                let end = self.clock.now();
                self.fail(&record, failure_detail(&failure), end)?;
                Ok(RunOutcome::Failed {
                    failure,
                })
            }
        }
    }

    /// Moves a non-terminal record directly to `ERROR`.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown ids and
    /// [`LifecycleError::InvalidTransition`] for terminal records.
    pub fn mark_error(&self, query_id: QueryId, detail: &str) -> Result<(), LifecycleError> {
        let record = self.store.get(query_id)?;
        ensure_transition(&record, QueryStatus::Error)?;
        self.fail(&record, detail.to_string(), self.clock.now())
    }

    /// Runs the backend and collects the schema then the tuple count.
    fn execute(
        &self,
        backend: Backend,
        name: &str,
    ) -> Result<(ResultSchema, i64), ExecutionFailure> {
        let output = self.runner.run(backend, name)?;
        if !output.success() {
            let kept = output.output.len().min(MAX_FAILURE_OUTPUT_BYTES);
            return Err(ExecutionFailure::NonZeroExit {
                exit_code: output.exit_code,
                output: String::from_utf8_lossy(&output.output[.. kept]).into_owned(),
            });
        }
        let strategy = self.engines.strategy(backend);
        let schema = strategy.read_schema(name)?;
        let num_tuples = strategy.read_tuple_count(name)?;
        Ok((schema, num_tuples))
    }

    /// Writes the `ERROR` state and emits the failure event.
    fn fail(
        &self,
        record: &QueryRecord,
        detail: String,
        end: Timestamp,
    ) -> Result<(), LifecycleError> {
        let update = RecordUpdate::finish(QueryStatus::Error, record.start_time, end);
        self.store.update(record.query_id, &update)?;
        self.audit.record(&LifecycleEvent::failed(record.query_id, detail, end));
        Ok(())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Rejects transitions the status machine does not allow.
fn ensure_transition(record: &QueryRecord, next: QueryStatus) -> Result<(), LifecycleError> {
    if record.status.can_transition_to(next) {
        return Ok(());
    }
    Err(LifecycleError::InvalidTransition {
        query_id: record.query_id,
        from: record.status,
        to: next,
    })
}

/// Renders a failure for the audit log, including backend output when present.
fn failure_detail(failure: &ExecutionFailure) -> String {
    match failure {
        ExecutionFailure::NonZeroExit {
            output,
            ..
        } if !output.trim().is_empty() => format!("{failure}: {}", output.trim()),
        _ => failure.to_string(),
    }
}
