// query-ledger-core/tests/lifecycle.rs
// ============================================================================
// Module: Lifecycle Controller Tests
// Description: Submission, execution, and terminal transition coverage.
// Purpose: Ensure records only move forward and failures land in ERROR.
// Dependencies: query-ledger-core, tempfile
// ============================================================================
//! ## Overview
//! Drives the lifecycle controller against the in-memory store with a
//! scripted runner and hand-written backend artifacts.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::sync::Arc;

use query_ledger_core::ArtifactError;
use query_ledger_core::Backend;
use query_ledger_core::BinaryEngine;
use query_ledger_core::EngineStrategy;
use query_ledger_core::ExecutionFailure;
use query_ledger_core::InMemoryQueryStore;
use query_ledger_core::LifecycleController;
use query_ledger_core::LifecycleError;
use query_ledger_core::ManualClock;
use query_ledger_core::MemoryAuditSink;
use query_ledger_core::QueryId;
use query_ledger_core::QueryRecord;
use query_ledger_core::QueryRecordStore;
use query_ledger_core::QueryStatus;
use query_ledger_core::RecordUpdate;
use query_ledger_core::RunOutcome;
use query_ledger_core::StorageFormat;
use query_ledger_core::StoreError;
use query_ledger_core::Timestamp;
use tempfile::TempDir;

use crate::common::ScriptedRunner;
use crate::common::engines;
use crate::common::submit_request;
use crate::common::write_ascii_count;
use crate::common::write_binary_log;
use crate::common::write_schema;

type Controller = LifecycleController<InMemoryQueryStore, ScriptedRunner, ManualClock>;

fn controller(dir: &TempDir, runner: ScriptedRunner) -> (Controller, ManualClock, Arc<MemoryAuditSink>) {
    let clock = ManualClock::new(Timestamp::from_unix_nanos(1_000_000));
    let audit = Arc::new(MemoryAuditSink::new());
    let controller =
        LifecycleController::new(InMemoryQueryStore::new(), runner, clock.clone(), engines(dir.path()))
            .with_audit(audit.clone());
    (controller, clock, audit)
}

#[test]
fn submit_records_accepted_query_with_derived_storage() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, audit) = controller(&dir, ScriptedRunner::succeeding());

    let record = controller.submit(submit_request(0, Backend::BinaryEngine, "out")).unwrap();

    assert_eq!(record.status, QueryStatus::Accepted);
    assert_eq!(record.storage, StorageFormat::Binary);
    assert_eq!(record.created, record.start_time);
    assert_eq!(record.end_time, None);
    assert_eq!(record.num_tuples, 0);
    assert!(record.schema.is_empty());
    assert_eq!(controller.store().get(QueryId::new(0)).unwrap(), record);
    assert_eq!(audit.events().len(), 1);
    assert_eq!(audit.events()[0].event, "query_submitted");
}

#[test]
fn submit_rejects_duplicate_query_id() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::succeeding());
    controller.submit(submit_request(3, Backend::AsciiEngine, "out")).unwrap();

    let err = controller.submit(submit_request(3, Backend::AsciiEngine, "other")).unwrap_err();

    assert!(matches!(err, LifecycleError::DuplicateQueryId(id) if id == QueryId::new(3)));
}

#[test]
fn ascii_run_reaches_success_with_schema_and_count() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::succeeding();
    let (controller, clock, audit) = controller(&dir, runner.clone());
    controller.submit(submit_request(0, Backend::AsciiEngine, "out")).unwrap();
    write_schema(dir.path(), "out", &["x", "y"], &["LONG_TYPE", "STRING_TYPE"]);
    write_ascii_count(dir.path(), "out", "42\n");
    clock.advance(500);

    let outcome = controller.mark_running(QueryId::new(0)).unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Succeeded {
            num_tuples: 42
        }
    );
    let record = controller.store().get(QueryId::new(0)).unwrap();
    assert_eq!(record.status, QueryStatus::Success);
    assert_eq!(record.num_tuples, 42);
    assert_eq!(record.schema.column_names, vec!["x", "y"]);
    assert_eq!(record.schema.column_types, vec!["LONG_TYPE", "STRING_TYPE"]);
    assert_eq!(record.end_time, Some(Timestamp::from_unix_nanos(1_000_500)));
    assert_eq!(record.elapsed_nanos, 500);
    assert_eq!(runner.calls(), vec![(Backend::AsciiEngine, "out".to_string())]);
    let names: Vec<&str> = audit.events().iter().map(|event| event.event).collect();
    assert_eq!(names, vec!["query_submitted", "query_running", "query_succeeded"]);
}

#[test]
fn binary_run_reads_emit_count_from_log() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::succeeding());
    controller.submit(submit_request(0, Backend::BinaryEngine, "edges")).unwrap();
    write_schema(dir.path(), "edges", &["src", "dst"], &["LONG_TYPE", "LONG_TYPE"]);
    write_binary_log(dir.path(), "edges", "{\"emit_count\": 17, \"elapsed\": 3}\n");

    let outcome = controller.mark_running(QueryId::new(0)).unwrap();

    assert_eq!(
        outcome,
        RunOutcome::Succeeded {
            num_tuples: 17
        }
    );
}

#[test]
fn relation_name_is_the_run_artifact() {
    let dir = TempDir::new().unwrap();
    let runner = ScriptedRunner::succeeding();
    let (controller, _clock, _audit) = controller(&dir, runner.clone());
    controller.submit(submit_request(0, Backend::AsciiEngine, "job_7")).unwrap();
    write_schema(dir.path(), "job_7", &["x"], &["LONG_TYPE"]);
    write_ascii_count(dir.path(), "job_7", "1");

    controller.mark_running(QueryId::new(0)).unwrap();

    assert_eq!(runner.calls(), vec![(Backend::AsciiEngine, "job_7".to_string())]);
}

/// Store that refuses every `SUCCESS` write.
#[derive(Default)]
struct SuccessRejectingStore {
    inner: InMemoryQueryStore,
}

impl QueryRecordStore for SuccessRejectingStore {
    fn create_table(&self) -> Result<(), StoreError> {
        self.inner.create_table()
    }

    fn insert(&self, record: &QueryRecord) -> Result<(), StoreError> {
        self.inner.insert(record)
    }

    fn update(&self, query_id: QueryId, update: &RecordUpdate) -> Result<(), StoreError> {
        if update.status == Some(QueryStatus::Success) {
            return Err(StoreError::Io("disk full".to_string()));
        }
        self.inner.update(query_id, update)
    }

    fn get(&self, query_id: QueryId) -> Result<QueryRecord, StoreError> {
        self.inner.get(query_id)
    }

    fn next_id(&self) -> Result<QueryId, StoreError> {
        self.inner.next_id()
    }
}

#[test]
fn failed_success_write_still_lands_in_error() {
    let dir = TempDir::new().unwrap();
    let audit = Arc::new(MemoryAuditSink::new());
    let controller = LifecycleController::new(
        SuccessRejectingStore::default(),
        ScriptedRunner::succeeding(),
        ManualClock::new(Timestamp::from_unix_nanos(1_000)),
        engines(dir.path()),
    )
    .with_audit(audit.clone());
    controller.submit(submit_request(0, Backend::AsciiEngine, "out")).unwrap();
    write_schema(dir.path(), "out", &["x"], &["LONG_TYPE"]);
    write_ascii_count(dir.path(), "out", "3");

    let err = controller.mark_running(QueryId::new(0)).unwrap_err();

    assert!(matches!(err, LifecycleError::Store(StoreError::Io(_))));
    let record = controller.store().get(QueryId::new(0)).unwrap();
    assert_eq!(record.status, QueryStatus::Error);
    assert!(record.end_time.is_some());
    let last = audit.events().last().cloned().unwrap();
    assert_eq!(last.event, "query_failed");
    assert!(last.detail.unwrap().contains("disk full"));
}

#[test]
fn nonzero_exit_moves_record_to_error() {
    let dir = TempDir::new().unwrap();
    let (controller, clock, audit) = controller(&dir, ScriptedRunner::exiting(2, "syntax error"));
    controller.submit(submit_request(0, Backend::AsciiEngine, "out")).unwrap();
    clock.advance(10);

    let outcome = controller.mark_running(QueryId::new(0)).unwrap();

    let RunOutcome::Failed {
        failure,
    } = outcome
    else {
        panic!("expected failure");
    };
    assert!(matches!(failure, ExecutionFailure::NonZeroExit { exit_code: Some(2), .. }));
    let record = controller.store().get(QueryId::new(0)).unwrap();
    assert_eq!(record.status, QueryStatus::Error);
    assert_eq!(record.elapsed_nanos, 10);
    assert!(record.end_time.is_some());
    let last = audit.events().last().cloned().unwrap();
    assert_eq!(last.event, "query_failed");
    assert!(last.detail.unwrap().contains("syntax error"));
}

#[test]
fn runner_spawn_failure_moves_record_to_error() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::unspawnable());
    controller.submit(submit_request(0, Backend::BinaryEngine, "out")).unwrap();

    let outcome = controller.mark_running(QueryId::new(0)).unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            failure: ExecutionFailure::Runner(_)
        }
    ));
    assert_eq!(controller.store().get(QueryId::new(0)).unwrap().status, QueryStatus::Error);
}

#[test]
fn missing_count_artifact_never_reports_success() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::succeeding());
    controller.submit(submit_request(0, Backend::AsciiEngine, "out")).unwrap();
    write_schema(dir.path(), "out", &["x"], &["LONG_TYPE"]);

    let outcome = controller.mark_running(QueryId::new(0)).unwrap();

    assert!(matches!(
        outcome,
        RunOutcome::Failed {
            failure: ExecutionFailure::Artifact(ArtifactError::Missing(_))
        }
    ));
    let record = controller.store().get(QueryId::new(0)).unwrap();
    assert_eq!(record.status, QueryStatus::Error);
    assert!(record.schema.is_empty());
}

#[test]
fn emit_count_parsing_is_shared_across_engines_and_calls() {
    let first = BinaryEngine::new("/tmp/a", "binary_");
    let second = BinaryEngine::new("/tmp/b", "run_");

    for (engine, log, count) in [
        (&first, "{\"emit_count\": 3}", 3),
        (&second, "noise\n\"emit_count\":12,\"elapsed\": 1", 12),
        (&first, "{\"emit_count\":0}", 0),
    ] {
        assert_eq!(engine.parse_tuple_count(log).unwrap(), count);
    }
    assert!(second.parse_tuple_count("{\"elapsed\": 4}").is_err());
}

#[test]
fn unparsable_count_and_missing_emit_count_fail() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::succeeding());
    controller.submit(submit_request(0, Backend::AsciiEngine, "a")).unwrap();
    controller.submit(submit_request(1, Backend::BinaryEngine, "b")).unwrap();
    write_schema(dir.path(), "a", &["x"], &["LONG_TYPE"]);
    write_schema(dir.path(), "b", &["x"], &["LONG_TYPE"]);
    write_ascii_count(dir.path(), "a", "many");
    write_binary_log(dir.path(), "b", "run finished\n");

    for id in [0, 1] {
        let outcome = controller.mark_running(QueryId::new(id)).unwrap();
        assert!(matches!(
            outcome,
            RunOutcome::Failed {
                failure: ExecutionFailure::Artifact(ArtifactError::Invalid { .. })
            }
        ));
    }
}

#[test]
fn mismatched_schema_lines_fail_the_run() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::succeeding());
    controller.submit(submit_request(0, Backend::AsciiEngine, "out")).unwrap();
    write_schema(dir.path(), "out", &["x", "y"], &["LONG_TYPE"]);
    write_ascii_count(dir.path(), "out", "1");

    let outcome = controller.mark_running(QueryId::new(0)).unwrap();

    assert!(matches!(outcome, RunOutcome::Failed { .. }));
}

#[test]
fn mark_running_requires_accepted_status() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::exiting(1, ""));
    controller.submit(submit_request(0, Backend::AsciiEngine, "out")).unwrap();
    controller.mark_running(QueryId::new(0)).unwrap();

    let err = controller.mark_running(QueryId::new(0)).unwrap_err();

    assert!(matches!(
        err,
        LifecycleError::InvalidTransition {
            from: QueryStatus::Error,
            to: QueryStatus::Running,
            ..
        }
    ));
}

#[test]
fn unknown_ids_are_not_found() {
    let dir = TempDir::new().unwrap();
    let (controller, _clock, _audit) = controller(&dir, ScriptedRunner::succeeding());

    assert!(matches!(
        controller.mark_running(QueryId::new(9)),
        Err(LifecycleError::NotFound(_))
    ));
    assert!(matches!(controller.mark_error(QueryId::new(9), "x"), Err(LifecycleError::NotFound(_))));
}

#[test]
fn mark_error_stamps_end_and_rejects_terminal_records() {
    let dir = TempDir::new().unwrap();
    let (controller, clock, audit) = controller(&dir, ScriptedRunner::succeeding());
    controller.submit(submit_request(0, Backend::AsciiEngine, "out")).unwrap();
    clock.advance(25);

    controller.mark_error(QueryId::new(0), "cancelled by user").unwrap();

    let record = controller.store().get(QueryId::new(0)).unwrap();
    assert_eq!(record.status, QueryStatus::Error);
    assert_eq!(record.elapsed_nanos, 25);
    assert_eq!(audit.events().last().unwrap().detail.as_deref(), Some("cancelled by user"));
    assert!(matches!(
        controller.mark_error(QueryId::new(0), "again"),
        Err(LifecycleError::InvalidTransition { .. })
    ));
}
