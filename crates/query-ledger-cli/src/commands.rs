// query-ledger-cli/src/commands.rs
// ============================================================================
// Module: CLI Command Context
// Description: Maps CLI operations onto the Query Ledger services.
// Purpose: Validate positional parameters and render JSON responses.
// Dependencies: query-ledger-core, percent-encoding, serde_json, thiserror
// ============================================================================

//! ## Overview
//! [`CommandContext`] owns one lifecycle controller, result decoder, catalog
//! service, and bulk importer, all sharing a single store handle. Each call
//! checks the parameter count, parses parameters into typed values, invokes
//! exactly one service operation, and returns the JSON document to print.
//! Logical failures come back as [`CommandError`], whose [`kind`] label is
//! stable across releases.
//!
//! [`kind`]: CommandError::kind

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use query_ledger_core::Backend;
use query_ledger_core::BulkImporter;
use query_ledger_core::CatalogIndex;
use query_ledger_core::Clock;
use query_ledger_core::DecodeError;
use query_ledger_core::EngineSet;
use query_ledger_core::ExecutionRunner;
use query_ledger_core::ImportError;
use query_ledger_core::LifecycleAuditSink;
use query_ledger_core::LifecycleController;
use query_ledger_core::LifecycleError;
use query_ledger_core::QueryCatalog;
use query_ledger_core::QueryId;
use query_ledger_core::QueryRecordStore;
use query_ledger_core::RelationKey;
use query_ledger_core::ResultDecoder;
use query_ledger_core::StoreError;
use query_ledger_core::SubmitRequest;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;

use crate::operation::Arity;
use crate::operation::Operation;
use crate::operation::UnknownOperation;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Logical command failures reported as tagged error lines.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The function name is not a known operation.
    #[error(transparent)]
    UnknownOperation(#[from] UnknownOperation),
    /// The parameter count does not match the operation.
    #[error("{operation} expects {expected} parameter(s), got {actual}")]
    Arity {
        /// Invoked operation.
        operation: Operation,
        /// Accepted counts.
        expected: Arity,
        /// Supplied count.
        actual: usize,
    },
    /// A parameter could not be parsed.
    #[error("invalid {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Parse failure.
        message: String,
    },
    /// Lifecycle transition failed.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    /// Result materialization failed.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Bulk import failed.
    #[error(transparent)]
    Import(#[from] ImportError),
    /// Store read failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Response could not be rendered.
    #[error("response serialization failed: {0}")]
    Serialize(String),
}

impl CommandError {
    /// Returns the stable error kind label.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::UnknownOperation(_) => "unknown_function",
            Self::Arity {
                ..
            }
            | Self::InvalidParameter {
                ..
            } => "invalid_arguments",
            Self::Lifecycle(err) => lifecycle_kind(err),
            Self::Decode(err) => decode_kind(err),
            Self::Import(ImportError::Store(err)) | Self::Store(err) => store_kind(err),
            Self::Import(_) => "import_error",
            Self::Serialize(_) => "internal_error",
        }
    }

    /// Renders the single-line `error: <kind>: <message>` form.
    #[must_use]
    pub fn tagged_line(&self) -> String {
        format!("error: {}: {self}", self.kind())
    }
}

/// Kind label for lifecycle failures.
const fn lifecycle_kind(err: &LifecycleError) -> &'static str {
    match err {
        LifecycleError::NotFound(_) => "not_found",
        LifecycleError::DuplicateQueryId(_) => "duplicate_key",
        LifecycleError::InvalidTransition {
            ..
        } => "invalid_transition",
        LifecycleError::Store(err) => store_kind(err),
    }
}

/// Kind label for decode failures.
const fn decode_kind(err: &DecodeError) -> &'static str {
    match err {
        DecodeError::NotSucceeded {
            ..
        } => "not_succeeded",
        DecodeError::ArtifactNotFound(_) => "artifact_not_found",
        DecodeError::SchemaUnavailable(_) => "schema_unavailable",
        DecodeError::Decode(_) | DecodeError::Io(_) => "decode_error",
        DecodeError::Store(err) => store_kind(err),
    }
}

/// Kind label for store failures.
const fn store_kind(err: &StoreError) -> &'static str {
    match err {
        StoreError::NotFound(_) | StoreError::RelationNotFound(_) => "not_found",
        StoreError::DuplicateKey(_) => "duplicate_key",
        StoreError::InvalidTransition {
            ..
        } => "invalid_transition",
        StoreError::Io(_)
        | StoreError::Corrupt(_)
        | StoreError::VersionMismatch(_)
        | StoreError::Invalid(_)
        | StoreError::Store(_) => "store_error",
    }
}

// ============================================================================
// SECTION: Command Context
// ============================================================================

/// Services behind every CLI operation, sharing one store.
pub struct CommandContext<S, R, C> {
    /// State transitions and backend execution.
    lifecycle: LifecycleController<S, R, C>,
    /// Caller-facing views.
    catalog: QueryCatalog<S, C>,
    /// Result artifact decoding.
    decoder: ResultDecoder<S>,
    /// CSV dataset import.
    importer: BulkImporter<S, C>,
}

impl<S, R, C> CommandContext<S, R, C>
where
    S: QueryRecordStore + CatalogIndex + Clone,
    R: ExecutionRunner,
    C: Clock + Clone,
{
    /// Builds every service over clones of `store` and `clock`.
    #[must_use]
    pub fn new(
        store: S,
        runner: R,
        clock: C,
        engines: EngineSet,
        audit: Arc<dyn LifecycleAuditSink>,
    ) -> Self {
        Self {
            catalog: QueryCatalog::new(store.clone(), clock.clone()),
            decoder: ResultDecoder::new(store.clone(), engines.clone()),
            importer: BulkImporter::new(store.clone(), clock.clone()),
            lifecycle: LifecycleController::new(store, runner, clock, engines).with_audit(audit),
        }
    }

    /// Parses `function` and dispatches it.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownOperation`] for unknown names and any
    /// error [`CommandContext::dispatch`] returns.
    pub fn run(&self, function: &str, params: &[String]) -> Result<Value, CommandError> {
        let operation: Operation = function.parse()?;
        self.dispatch(operation, params)
    }

    /// Executes `operation` with positional `params`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] when parameters are invalid or the underlying
    /// operation fails.
    pub fn dispatch(&self, operation: Operation, params: &[String]) -> Result<Value, CommandError> {
        let arity = operation.arity();
        if !arity.accepts(params.len()) {
            return Err(CommandError::Arity {
                operation,
                expected: arity,
                actual: params.len(),
            });
        }
        match operation {
            Operation::Submit => self.submit(params),
            Operation::MarkRunning => {
                let query_id = parse_param("qid", &params[0])?;
                self.lifecycle.mark_running(query_id)?;
                to_json(&self.catalog.status(query_id)?)
            }
            Operation::MarkError => {
                let query_id = parse_param("qid", &params[0])?;
                self.lifecycle.mark_error(query_id, &params[1 ..].join(" "))?;
                to_json(&self.catalog.status(query_id)?)
            }
            Operation::GetStatus => {
                to_json(&self.catalog.status(parse_param("qid", &params[0])?)?)
            }
            Operation::CatalogLookup => {
                let key = relation_key(&params[0], &params[1], &params[2])?;
                match self.catalog.lookup(&key)? {
                    Some(entry) => to_json(&entry),
                    None => Ok(json!({})),
                }
            }
            Operation::RangeSelect => {
                let min: QueryId = parse_param("min", &params[0])?;
                let max: QueryId = parse_param("max", &params[1])?;
                let backend: Backend = parse_param("backend", &params[2])?;
                to_json(&self.catalog.range(backend, min, max)?)
            }
            Operation::RowSelect => to_json(&self.catalog.row(parse_param("qid", &params[0])?)?),
            Operation::AllSelect => {
                to_json(&self.catalog.all(parse_param("backend", &params[0])?)?)
            }
            Operation::MaterializeResults => {
                let decoded = self.decoder.decode(parse_param("qid", &params[0])?)?;
                to_json(&decoded.into_elements()?)
            }
            Operation::TupleCount => {
                let key = relation_key(&params[0], &params[1], &params[2])?;
                to_json(&self.catalog.tuple_count(&key)?)
            }
            Operation::LatestId => to_json(&self.catalog.latest_id()?),
            Operation::BulkImport => {
                let summary = self.importer.import_file(Path::new(&params[0]))?;
                Ok(json!({ "imported": summary.imported }))
            }
        }
    }

    /// Records a submission: `relkey url qid backend rawQuery`.
    fn submit(&self, params: &[String]) -> Result<Value, CommandError> {
        let relation_key = RelationKey::parse_joined(&params[0]).map_err(|err| {
            CommandError::InvalidParameter {
                name: "relkey",
                message: err.to_string(),
            }
        })?;
        let raw_query = percent_decode_str(&params[4]).decode_utf8().map_err(|err| {
            CommandError::InvalidParameter {
                name: "rawQuery",
                message: err.to_string(),
            }
        })?;
        let request = SubmitRequest {
            relation_key,
            url: params[1].clone(),
            query_id: parse_param("qid", &params[2])?,
            backend: parse_param("backend", &params[3])?,
            raw_query: raw_query.into_owned(),
        };
        let record = self.lifecycle.submit(request)?;
        to_json(&self.catalog.status(record.query_id)?)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a named positional parameter.
fn parse_param<T>(name: &'static str, value: &str) -> Result<T, CommandError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|err: T::Err| CommandError::InvalidParameter {
        name,
        message: err.to_string(),
    })
}

/// Builds a relation key from its three parts.
fn relation_key(user: &str, program: &str, relation: &str) -> Result<RelationKey, CommandError> {
    RelationKey::from_parts(user, program, relation).map_err(|err| {
        CommandError::InvalidParameter {
            name: "relation key",
            message: err.to_string(),
        }
    })
}

/// Serializes a response value.
fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, CommandError> {
    serde_json::to_value(value).map_err(|err| CommandError::Serialize(err.to_string()))
}
