// query-ledger-core/src/runtime/mod.rs
// ============================================================================
// Module: Query Ledger Runtime
// Description: Lifecycle controller, result decoder, and catalog services.
// Purpose: Drive query state transitions and materialize backend results.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The runtime layer implements the ledger's behavior on top of the
//! interfaces: lifecycle transitions around backend execution, per-backend
//! artifact strategies, result decoding, caller-facing catalog views, and
//! bulk import. It also ships an in-memory store and clocks for tests.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod catalog;
pub mod clock;
pub mod decoder;
pub mod engine;
pub mod import;
pub mod lifecycle;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::MemoryAuditSink;
pub use audit::NoopAuditSink;
pub use catalog::QueryCatalog;
pub use clock::ManualClock;
pub use clock::SystemClock;
pub use decoder::DecodeError;
pub use decoder::DecodedResult;
pub use decoder::ResultDecoder;
pub use decoder::ResultElement;
pub use decoder::TupleStream;
pub use engine::ArtifactError;
pub use engine::AsciiEngine;
pub use engine::BinaryEngine;
pub use engine::EngineSet;
pub use engine::EngineStrategy;
pub use import::BulkImporter;
pub use import::ImportError;
pub use import::ImportSummary;
pub use lifecycle::ExecutionFailure;
pub use lifecycle::LifecycleController;
pub use lifecycle::LifecycleError;
pub use lifecycle::RunOutcome;
pub use lifecycle::SubmitRequest;
pub use store::InMemoryQueryStore;
