// query-ledger-core/src/core/time.rs
// ============================================================================
// Module: Query Ledger Time Model
// Description: Timestamp representation for record bounds and audit events.
// Purpose: Keep nanosecond-precision wall-clock values explicit and testable.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Records carry wall-clock timestamps as signed nanoseconds since the Unix
//! epoch. The core never reads the clock directly; hosts supply time through
//! the [`crate::interfaces::Clock`] interface so lifecycle behavior stays
//! deterministic under test.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Time Values
// ============================================================================

/// Wall-clock timestamp in nanoseconds since the Unix epoch.
///
/// # Invariants
/// - Values are supplied by a clock; no monotonicity is enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from Unix epoch nanoseconds.
    #[must_use]
    pub const fn from_unix_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    /// Returns the timestamp as Unix epoch nanoseconds.
    #[must_use]
    pub const fn as_unix_nanos(self) -> i64 {
        self.0
    }

    /// Returns the nanoseconds elapsed since `earlier`.
    ///
    /// A clock that stepped backwards yields zero rather than a negative
    /// duration.
    #[must_use]
    pub const fn nanos_since(self, earlier: Self) -> i64 {
        let delta = self.0.saturating_sub(earlier.0);
        if delta < 0 { 0 } else { delta }
    }

    /// Renders the timestamp as an RFC 3339 string in UTC.
    ///
    /// Values outside the representable calendar range fall back to the raw
    /// nanosecond count.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(self.0))
            .ok()
            .and_then(|value| value.format(&Rfc3339).ok())
            .unwrap_or_else(|| self.0.to_string())
    }
}
