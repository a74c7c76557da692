// query-ledger-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Query Record Store
// Description: Durable QueryRecordStore backend using SQLite.
// Purpose: Provide the production persistence for Query Ledger records.
// Dependencies: query-ledger-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`QueryRecordStore`] and
//! [`CatalogIndex`] implementation holding every query record in one table.
//! The store is opened once per process and shared by the lifecycle
//! controller, result decoder, and catalog service. Security posture: storage
//! inputs are untrusted and fail closed.
//!
//! [`QueryRecordStore`]: query_ledger_core::QueryRecordStore
//! [`CatalogIndex`]: query_ledger_core::CatalogIndex

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SCHEMA_VERSION;
pub use store::SqliteQueryStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
