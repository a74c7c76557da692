// query-ledger-core/src/runtime/store.rs
// ============================================================================
// Module: Query Ledger In-Memory Store
// Description: Simple in-memory query record store for tests and examples.
// Purpose: Provide a store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides an in-memory implementation of [`QueryRecordStore`]
//! and [`CatalogIndex`] with the same semantics as the `SQLite` store. It is
//! not intended for production use.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::core::Backend;
use crate::core::QueryId;
use crate::core::QueryRecord;
use crate::core::RecordUpdate;
use crate::core::RelationKey;
use crate::interfaces::CatalogIndex;
use crate::interfaces::QueryRecordStore;
use crate::interfaces::RangeSelection;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory query record store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryQueryStore {
    /// Records keyed by id, protected by a mutex.
    records: Arc<Mutex<BTreeMap<QueryId, QueryRecord>>>,
}

impl InMemoryQueryStore {
    /// Creates a new in-memory query store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks the record map.
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<QueryId, QueryRecord>>, StoreError> {
        self.records.lock().map_err(|_| StoreError::Store("query store mutex poisoned".to_string()))
    }
}

impl QueryRecordStore for InMemoryQueryStore {
    fn create_table(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn insert(&self, record: &QueryRecord) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        if guard.contains_key(&record.query_id) {
            return Err(StoreError::DuplicateKey(record.query_id));
        }
        guard.insert(record.query_id, record.clone());
        Ok(())
    }

    fn update(&self, query_id: QueryId, update: &RecordUpdate) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let record = guard.get_mut(&query_id).ok_or(StoreError::NotFound(query_id))?;
        if let Some(next) = update.status
            && next != record.status
            && !record.status.can_transition_to(next)
        {
            return Err(StoreError::InvalidTransition {
                query_id,
                from: record.status,
                to: next,
            });
        }
        update.apply_to(record);
        Ok(())
    }

    fn get(&self, query_id: QueryId) -> Result<QueryRecord, StoreError> {
        self.lock()?.get(&query_id).cloned().ok_or(StoreError::NotFound(query_id))
    }

    fn next_id(&self) -> Result<QueryId, StoreError> {
        let guard = self.lock()?;
        match guard.keys().next_back() {
            None => Ok(QueryId::ZERO),
            Some(last) => last
                .next()
                .ok_or_else(|| StoreError::Invalid("query id space exhausted".to_string())),
        }
    }
}

impl CatalogIndex for InMemoryQueryStore {
    fn latest_by_relation_key(&self, key: &RelationKey) -> Result<Option<QueryRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.values().rev().find(|record| &record.relation_key == key).cloned())
    }

    fn range_by_backend(
        &self,
        backend: Backend,
        min_id: QueryId,
        max_id: QueryId,
    ) -> Result<RangeSelection, StoreError> {
        let guard = self.lock()?;
        let unbounded = max_id == QueryId::ZERO;
        let in_upper = |id: QueryId| unbounded || id <= max_id;
        let of_backend = || guard.values().filter(move |record| record.backend == backend);
        let records: Vec<QueryRecord> = of_backend()
            .filter(|record| record.query_id >= min_id && in_upper(record.query_id))
            .cloned()
            .collect();
        let min = of_backend()
            .map(|record| record.query_id)
            .find(|id| *id >= min_id)
            .unwrap_or(QueryId::ZERO);
        let max = of_backend()
            .map(|record| record.query_id)
            .filter(|id| in_upper(*id))
            .next_back()
            .unwrap_or(QueryId::ZERO);
        Ok(RangeSelection {
            min,
            max,
            records,
        })
    }

    fn all_by_backend(&self, backend: Backend) -> Result<Vec<QueryRecord>, StoreError> {
        let guard = self.lock()?;
        Ok(guard.values().filter(|record| record.backend == backend).cloned().collect())
    }

    fn latest_query_id(&self) -> Result<QueryId, StoreError> {
        Ok(self.lock()?.keys().next_back().copied().unwrap_or(QueryId::ZERO))
    }
}
