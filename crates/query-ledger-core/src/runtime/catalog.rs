// query-ledger-core/src/runtime/catalog.rs
// ============================================================================
// Module: Query Ledger Catalog Service
// Description: Caller-facing read views over the record store.
// Purpose: Assemble status, catalog, and listing documents from records.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! The catalog service answers read-only questions about recorded queries.
//! It never changes records; status reports observe the clock so running
//! queries report a live elapsed time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::Backend;
use crate::core::CatalogEntry;
use crate::core::QueryId;
use crate::core::QueryRow;
use crate::core::RangeView;
use crate::core::RelationKey;
use crate::core::StatusReport;
use crate::core::TupleCount;
use crate::interfaces::CatalogIndex;
use crate::interfaces::Clock;
use crate::interfaces::QueryRecordStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: Catalog Service
// ============================================================================

/// Read-only views over recorded queries.
pub struct QueryCatalog<S, C> {
    /// Record store and index.
    store: S,
    /// Time source for live elapsed values.
    clock: C,
}

impl<S, C> QueryCatalog<S, C>
where
    S: QueryRecordStore + CatalogIndex,
    C: Clock,
{
    /// Creates a catalog service.
    #[must_use]
    pub const fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
        }
    }

    /// Returns the status report of a query.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown ids.
    pub fn status(&self, query_id: QueryId) -> Result<StatusReport, StoreError> {
        let record = self.store.get(query_id)?;
        Ok(StatusReport::from_record(&record, self.clock.now()))
    }

    /// Returns the latest catalog entry for a relation key, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    pub fn lookup(&self, key: &RelationKey) -> Result<Option<CatalogEntry>, StoreError> {
        Ok(self.store.latest_by_relation_key(key)?.as_ref().map(CatalogEntry::from))
    }

    /// Returns the rows of `backend` within an id window.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    pub fn range(
        &self,
        backend: Backend,
        min_id: QueryId,
        max_id: QueryId,
    ) -> Result<RangeView, StoreError> {
        let selection = self.store.range_by_backend(backend, min_id, max_id)?;
        let now = self.clock.now();
        Ok(RangeView {
            min: selection.min,
            max: selection.max,
            results: selection
                .records
                .iter()
                .map(|record| QueryRow::from_record(record, now))
                .collect(),
        })
    }

    /// Returns the full row of one query; empty when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    pub fn row(&self, query_id: QueryId) -> Result<Vec<QueryRow>, StoreError> {
        match self.store.get(query_id) {
            Ok(record) => Ok(vec![QueryRow::from_record(&record, self.clock.now())]),
            Err(StoreError::NotFound(_)) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// Returns every row of `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    pub fn all(&self, backend: Backend) -> Result<Vec<QueryRow>, StoreError> {
        let now = self.clock.now();
        Ok(self
            .store
            .all_by_backend(backend)?
            .iter()
            .map(|record| QueryRow::from_record(record, now))
            .collect())
    }

    /// Returns the tuple count of the latest record for a relation key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RelationNotFound`] when nothing was recorded.
    pub fn tuple_count(&self, key: &RelationKey) -> Result<TupleCount, StoreError> {
        let record = self
            .store
            .latest_by_relation_key(key)?
            .ok_or_else(|| StoreError::RelationNotFound(key.clone()))?;
        Ok(TupleCount {
            num_tuples: record.num_tuples,
        })
    }

    /// Returns the highest recorded id, or 0.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    pub fn latest_id(&self) -> Result<QueryId, StoreError> {
        self.store.latest_query_id()
    }

    /// Returns the id the next submission should use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    pub fn next_id(&self) -> Result<QueryId, StoreError> {
        self.store.next_id()
    }
}
