// query-ledger-core/src/lib.rs
// ============================================================================
// Module: Query Ledger Core Library
// Description: Public API surface for the Query Ledger core.
// Purpose: Expose record types, interfaces, and runtime services.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Query Ledger core tracks analytic queries executed by external backend
//! engines. It owns the query record model and its status state machine,
//! drives lifecycle transitions around an opaque execution runner, and decodes
//! backend result artifacts into one uniform tuple stream. Persistence and
//! process execution are reached through explicit interfaces so hosts can
//! plug in `SQLite`, in-memory stores, or test doubles.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CatalogIndex;
pub use interfaces::Clock;
pub use interfaces::ExecutionRunner;
pub use interfaces::LifecycleAuditSink;
pub use interfaces::LifecycleEvent;
pub use interfaces::QueryRecordStore;
pub use interfaces::RangeSelection;
pub use interfaces::RunOutput;
pub use interfaces::RunnerError;
pub use interfaces::StoreError;
pub use runtime::ArtifactError;
pub use runtime::AsciiEngine;
pub use runtime::BinaryEngine;
pub use runtime::BulkImporter;
pub use runtime::DecodeError;
pub use runtime::DecodedResult;
pub use runtime::EngineSet;
pub use runtime::EngineStrategy;
pub use runtime::ExecutionFailure;
pub use runtime::ImportError;
pub use runtime::ImportSummary;
pub use runtime::InMemoryQueryStore;
pub use runtime::LifecycleController;
pub use runtime::LifecycleError;
pub use runtime::ManualClock;
pub use runtime::MemoryAuditSink;
pub use runtime::NoopAuditSink;
pub use runtime::QueryCatalog;
pub use runtime::ResultDecoder;
pub use runtime::ResultElement;
pub use runtime::RunOutcome;
pub use runtime::SubmitRequest;
pub use runtime::SystemClock;
pub use runtime::TupleStream;
