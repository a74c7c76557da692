// query-ledger-cli/src/operation.rs
// ============================================================================
// Module: CLI Operations
// Description: Closed set of functions the CLI can invoke.
// Purpose: Reject unknown function names before any store access.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Every function name accepted on the command line maps to exactly one
//! [`Operation`]. Each operation declares how many positional parameters it
//! takes so argument count errors are reported uniformly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

// ============================================================================
// SECTION: Operation
// ============================================================================

/// Function invoked by a CLI call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Record a new query as `ACCEPTED`.
    Submit,
    /// Run an accepted query and record its terminal state.
    MarkRunning,
    /// Move a non-terminal query to `ERROR`.
    MarkError,
    /// Report the execution status of a query.
    GetStatus,
    /// Look up the latest dataset of a relation key.
    CatalogLookup,
    /// List one backend's queries within an id window.
    RangeSelect,
    /// List a single query.
    RowSelect,
    /// List every query of one backend.
    AllSelect,
    /// Decode the result artifact of a finished query.
    MaterializeResults,
    /// Report the tuple count of a relation key.
    TupleCount,
    /// Report the highest query id.
    LatestId,
    /// Import finished datasets from a CSV file.
    BulkImport,
}

/// Accepted parameter counts for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Minimum number of parameters.
    pub min: usize,
    /// Maximum number of parameters; `None` when unbounded.
    pub max: Option<usize>,
}

impl Arity {
    /// Exactly `count` parameters.
    const fn exactly(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    /// Returns true when `count` parameters are acceptable.
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        count >= self.min && self.max.is_none_or(|max| count <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{max}"),
            Some(max) => write!(f, "{} to {max}", self.min),
            None => write!(f, "at least {}", self.min),
        }
    }
}

impl Operation {
    /// Every operation, in help order.
    pub const ALL: [Self; 12] = [
        Self::Submit,
        Self::MarkRunning,
        Self::MarkError,
        Self::GetStatus,
        Self::CatalogLookup,
        Self::RangeSelect,
        Self::RowSelect,
        Self::AllSelect,
        Self::MaterializeResults,
        Self::TupleCount,
        Self::LatestId,
        Self::BulkImport,
    ];

    /// Returns the command-line function name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::MarkRunning => "mark-running",
            Self::MarkError => "mark-error",
            Self::GetStatus => "get-status",
            Self::CatalogLookup => "catalog-lookup",
            Self::RangeSelect => "range-select",
            Self::RowSelect => "row-select",
            Self::AllSelect => "all-select",
            Self::MaterializeResults => "materialize-results",
            Self::TupleCount => "tuple-count",
            Self::LatestId => "latest-id",
            Self::BulkImport => "bulk-import",
        }
    }

    /// Returns the accepted parameter counts.
    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::Submit => Arity::exactly(5),
            Self::MarkError => Arity {
                min: 2,
                max: None,
            },
            Self::MarkRunning
            | Self::GetStatus
            | Self::RowSelect
            | Self::AllSelect
            | Self::MaterializeResults
            | Self::BulkImport => Arity::exactly(1),
            Self::CatalogLookup | Self::TupleCount | Self::RangeSelect => Arity::exactly(3),
            Self::LatestId => Arity::exactly(0),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Function name that matches no [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown function '{0}'")]
pub struct UnknownOperation(pub String);

impl FromStr for Operation {
    type Err = UnknownOperation;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.name() == value)
            .ok_or_else(|| UnknownOperation(value.to_string()))
    }
}
