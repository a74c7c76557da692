// query-ledger-core/src/core/mod.rs
// ============================================================================
// Module: Query Ledger Core Types
// Description: Canonical query record, status, and view structures.
// Purpose: Provide stable, serializable types shared by stores and callers.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Core types define the query record persisted by every store, the status
//! state machine that governs it, and the caller-facing views assembled from
//! records. These types are the canonical source of truth for derived
//! surfaces such as the CLI.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod identifiers;
pub mod record;
pub mod time;
pub mod views;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::ParseError;
pub use identifiers::QueryId;
pub use identifiers::RelationKey;
pub use record::Backend;
pub use record::ColumnDef;
pub use record::QueryRecord;
pub use record::QueryStatus;
pub use record::RECORD_COLUMNS;
pub use record::RECORD_TABLE;
pub use record::RecordUpdate;
pub use record::ResultSchema;
pub use record::StorageFormat;
pub use time::Timestamp;
pub use views::CatalogEntry;
pub use views::QueryRow;
pub use views::RangeView;
pub use views::StatusReport;
pub use views::TupleCount;
