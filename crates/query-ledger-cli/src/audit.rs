// query-ledger-cli/src/audit.rs
// ============================================================================
// Module: CLI Audit Logging
// Description: JSON-line sinks for lifecycle audit events.
// Purpose: Route lifecycle transitions to stderr or an append-only file.
// Dependencies: query-ledger-core, query-ledger-config, serde_json
// ============================================================================

//! ## Overview
//! Lifecycle events are written as one JSON object per line. Write failures
//! are dropped so auditing never changes the outcome of a command.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use query_ledger_config::AuditConfig;
use query_ledger_config::AuditSinkKind;
use query_ledger_core::LifecycleAuditSink;
use query_ledger_core::LifecycleEvent;
use query_ledger_core::NoopAuditSink;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Audit sink that logs JSON lines to stderr.
pub struct StderrAuditSink;

impl LifecycleAuditSink for StderrAuditSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Audit sink that logs JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl LifecycleAuditSink for FileAuditSink {
    fn record(&self, event: &LifecycleEvent) {
        if let Ok(payload) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{payload}");
            let _ = file.flush();
        }
    }
}

// ============================================================================
// SECTION: Construction
// ============================================================================

/// Builds the sink selected by the `[audit]` section.
///
/// # Errors
///
/// Returns an error when the file sink cannot open its log.
pub fn build_audit_sink(config: &AuditConfig) -> io::Result<Arc<dyn LifecycleAuditSink>> {
    match (config.sink, &config.path) {
        (AuditSinkKind::File, Some(path)) => Ok(Arc::new(FileAuditSink::new(path)?)),
        (AuditSinkKind::File, None) => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "file audit sink requires audit.path",
        )),
        (AuditSinkKind::Stderr, _) => Ok(Arc::new(StderrAuditSink)),
        (AuditSinkKind::None, _) => Ok(Arc::new(NoopAuditSink)),
    }
}
