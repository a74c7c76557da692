// query-ledger-cli/src/lib.rs
// ============================================================================
// Module: Query Ledger CLI Library
// Description: Command routing, process runner, and audit sinks for the CLI.
// Purpose: Provide reusable components for the CLI binary and tests.
// Dependencies: query-ledger-core, query-ledger-config, serde_json
// ============================================================================

//! ## Overview
//! This library houses everything the `query-ledger` binary does besides
//! argument parsing: the closed set of operations, the command context that
//! maps each operation onto the core services, the process-backed execution
//! runner, and the JSON-line audit sinks. The binary entry point
//! (`src/main.rs`) wires these together from configuration.
//!
//! Security posture: CLI inputs are untrusted and must be validated before
//! they reach the store.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod commands;
pub mod operation;
pub mod runner;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use commands::CommandContext;
pub use commands::CommandError;
pub use operation::Operation;
pub use operation::UnknownOperation;
pub use runner::ProcessRunner;
