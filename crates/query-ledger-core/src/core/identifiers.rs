// query-ledger-core/src/core/identifiers.rs
// ============================================================================
// Module: Query Ledger Identifiers
// Description: Query identifiers and relation keys.
// Purpose: Provide strongly typed, serializable keys with stable string forms.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Query identifiers are store-assigned integers; relation keys name the
//! logical dataset a query produces. Both serialize in the shapes callers
//! already consume (a bare integer and a `userName`/`programName`/
//! `relationName` object).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Parse Errors
// ============================================================================

/// Errors raised while parsing identifiers and record labels from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Query identifier is not a non-negative integer.
    #[error("invalid query id: {0}")]
    InvalidQueryId(String),
    /// Relation key is malformed.
    #[error("invalid relation key: {0}")]
    InvalidRelationKey(String),
    /// Backend label is not one of the known engines.
    #[error("unknown backend: {0}")]
    UnknownBackend(String),
    /// Status label is not a known lifecycle state.
    #[error("unknown status: {0}")]
    UnknownStatus(String),
    /// Storage label is not a known encoding.
    #[error("unknown storage: {0}")]
    UnknownStorage(String),
    /// Schema text could not be parsed.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

// ============================================================================
// SECTION: Query Identifier
// ============================================================================

/// Store-assigned query identifier.
///
/// # Invariants
/// - Assigned once and never reused; new identifiers are `max + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryId(u64);

impl QueryId {
    /// The first identifier handed out by an empty store.
    pub const ZERO: Self = Self(0);

    /// Creates a query identifier from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the identifier following this one, or `None` on overflow.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for QueryId {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|_| ParseError::InvalidQueryId(value.to_string()))
    }
}

impl From<u64> for QueryId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// ============================================================================
// SECTION: Relation Key
// ============================================================================

/// Separator used by the joined relation key form (`user_program_relation`).
pub const RELATION_KEY_SEPARATOR: char = '_';

/// Triple identifying a logical dataset.
///
/// # Invariants
/// - Not unique per query; many records may target the same key over time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationKey {
    /// Owning user name.
    pub user_name: String,
    /// Program name within the user namespace.
    pub program_name: String,
    /// Relation name; also the base name of the result artifacts.
    pub relation_name: String,
}

impl RelationKey {
    /// Creates a relation key from its components.
    #[must_use]
    pub fn new(
        user_name: impl Into<String>,
        program_name: impl Into<String>,
        relation_name: impl Into<String>,
    ) -> Self {
        Self {
            user_name: user_name.into(),
            program_name: program_name.into(),
            relation_name: relation_name.into(),
        }
    }

    /// Parses the joined `user_program_relation` form.
    ///
    /// The first two separators split the key; the relation name keeps any
    /// further underscores.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidRelationKey`] when fewer than three
    /// non-empty parts are present.
    pub fn parse_joined(value: &str) -> Result<Self, ParseError> {
        let mut parts = value.splitn(3, RELATION_KEY_SEPARATOR);
        let (Some(user), Some(program), Some(relation)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(ParseError::InvalidRelationKey(format!(
                "expected user{RELATION_KEY_SEPARATOR}program{RELATION_KEY_SEPARATOR}relation, got \
                 {value}"
            )));
        };
        Self::from_parts(user, program, relation)
    }

    /// Builds a relation key from separate parts, rejecting empty components.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::InvalidRelationKey`] when any part is empty.
    pub fn from_parts(user: &str, program: &str, relation: &str) -> Result<Self, ParseError> {
        if user.is_empty() || program.is_empty() || relation.is_empty() {
            return Err(ParseError::InvalidRelationKey(
                "relation key parts must be non-empty".to_string(),
            ));
        }
        Ok(Self::new(user, program, relation))
    }

    /// Returns the joined `user_program_relation` form.
    #[must_use]
    pub fn joined(&self) -> String {
        format!(
            "{}{RELATION_KEY_SEPARATOR}{}{RELATION_KEY_SEPARATOR}{}",
            self.user_name, self.program_name, self.relation_name
        )
    }
}

impl fmt::Display for RelationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}
