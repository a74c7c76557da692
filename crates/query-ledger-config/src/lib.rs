// query-ledger-config/src/lib.rs
// ============================================================================
// Module: Query Ledger Config Library
// Description: Configuration model and validation for Query Ledger.
// Purpose: Single source of truth for query-ledger.toml semantics.
// Dependencies: query-ledger-core, query-ledger-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `query-ledger-config` defines the configuration model for the Query Ledger
//! command surface: where the record store lives, where each backend engine
//! leaves its artifacts, how backend runs are launched, and where lifecycle
//! audit events go. Validation is strict and fails closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
