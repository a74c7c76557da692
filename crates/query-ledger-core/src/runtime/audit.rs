// query-ledger-core/src/runtime/audit.rs
// ============================================================================
// Module: Query Ledger Audit Sinks
// Description: In-process lifecycle audit sinks.
// Purpose: Provide no-op and capturing sinks without external dependencies.
// Dependencies: crate::interfaces
// ============================================================================

//! ## Overview
//! Hosts route lifecycle events to their own logging pipeline through
//! [`LifecycleAuditSink`]. This module provides the two sinks the core needs
//! itself: one that drops events and one that keeps them in memory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;

use crate::interfaces::LifecycleAuditSink;
use crate::interfaces::LifecycleEvent;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that discards events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl LifecycleAuditSink for NoopAuditSink {
    fn record(&self, _event: &LifecycleEvent) {}
}

/// Audit sink that keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    /// Captured events in arrival order.
    events: Mutex<Vec<LifecycleEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the captured events.
    #[must_use]
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }
}

impl LifecycleAuditSink for MemoryAuditSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
