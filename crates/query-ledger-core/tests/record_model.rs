// query-ledger-core/tests/record_model.rs
// ============================================================================
// Module: Record Model Tests
// Description: Status machine, identifiers, schema artifacts, and time.
// Purpose: Ensure the record model enforces its invariants on its own.
// Dependencies: query-ledger-core, serde_json
// ============================================================================
//! ## Overview
//! Unit-level checks of the core record types that every store relies on.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use query_ledger_core::Backend;
use query_ledger_core::ParseError;
use query_ledger_core::QueryId;
use query_ledger_core::QueryStatus;
use query_ledger_core::RECORD_COLUMNS;
use query_ledger_core::RelationKey;
use query_ledger_core::ResultSchema;
use query_ledger_core::StorageFormat;
use query_ledger_core::Timestamp;
use serde_json::json;

#[test]
fn status_transitions_only_move_forward() {
    use QueryStatus::Accepted;
    use QueryStatus::Error;
    use QueryStatus::Running;
    use QueryStatus::Success;

    let allowed = [(Accepted, Running), (Accepted, Error), (Running, Success), (Running, Error)];
    for from in [Accepted, Running, Success, Error] {
        for to in [Accepted, Running, Success, Error] {
            assert_eq!(from.can_transition_to(to), allowed.contains(&(from, to)), "{from} -> {to}");
        }
    }
    assert!(Success.is_terminal());
    assert!(Error.is_terminal());
    assert!(!Running.is_terminal());
}

#[test]
fn labels_parse_and_render_canonically() {
    assert_eq!("SUCCESS".parse::<QueryStatus>().unwrap(), QueryStatus::Success);
    assert_eq!("binary-engine".parse::<Backend>().unwrap(), Backend::BinaryEngine);
    assert_eq!(Backend::AsciiEngine.storage(), StorageFormat::RowAscii);
    assert_eq!(Backend::BinaryEngine.storage(), StorageFormat::Binary);
    assert_eq!("row_ascii".parse::<StorageFormat>().unwrap(), StorageFormat::RowAscii);
    assert!(matches!("clang".parse::<Backend>(), Err(ParseError::UnknownBackend(_))));
    assert!(matches!("DONE".parse::<QueryStatus>(), Err(ParseError::UnknownStatus(_))));
    assert_eq!(serde_json::to_value(Backend::AsciiEngine).unwrap(), json!("ascii-engine"));
    assert_eq!(serde_json::to_value(QueryStatus::Accepted).unwrap(), json!("ACCEPTED"));
}

#[test]
fn relation_key_joined_form_allows_underscores_in_relation() {
    let key = RelationKey::parse_joined("public_adhoc_edge_list").unwrap();

    assert_eq!(key.user_name, "public");
    assert_eq!(key.program_name, "adhoc");
    assert_eq!(key.relation_name, "edge_list");
    assert_eq!(key.joined(), "public_adhoc_edge_list");
    assert!(RelationKey::parse_joined("public_adhoc").is_err());
    assert!(RelationKey::parse_joined("public__rel").is_err());
}

#[test]
fn query_id_parses_trimmed_integers() {
    assert_eq!(" 12 ".parse::<QueryId>().unwrap(), QueryId::new(12));
    assert!("-1".parse::<QueryId>().is_err());
    assert_eq!(QueryId::new(u64::MAX).next(), None);
}

#[test]
fn schema_artifact_accepts_list_literals_and_json() {
    let literal = ResultSchema::parse_artifact("['src', \"dst\"]\n['LONG_TYPE', 'LONG_TYPE']\n").unwrap();
    let json = ResultSchema::parse_artifact("[\"src\",\"dst\"]\n[\"LONG_TYPE\",\"LONG_TYPE\"]").unwrap();

    assert_eq!(literal, json);
    assert_eq!(literal.column_count(), 2);
    assert_eq!(ResultSchema::parse_artifact("[]\n[]\n").unwrap(), ResultSchema::empty());
}

#[test]
fn schema_artifact_rejects_malformed_content() {
    for text in ["", "['a']", "['a']\n['x', 'y']", "a, b\nx, y", "['a'\n['x']", "['a' 'b']\n['x']"] {
        assert!(
            matches!(ResultSchema::parse_artifact(text), Err(ParseError::InvalidSchema(_))),
            "accepted {text}"
        );
    }
}

#[test]
fn schema_persists_as_structured_json() {
    let schema = ResultSchema::new(vec!["a".to_string()], vec!["LONG_TYPE".to_string()]);

    let stored = schema.to_json().unwrap();

    assert_eq!(
        serde_json::from_str::<serde_json::Value>(&stored).unwrap(),
        json!({"columnNames": ["a"], "columnTypes": ["LONG_TYPE"]})
    );
    assert_eq!(ResultSchema::from_json(&stored).unwrap(), schema);
}

#[test]
fn elapsed_saturates_and_renders_rfc3339() {
    let start = Timestamp::from_unix_nanos(2_000);

    assert_eq!(Timestamp::from_unix_nanos(1_000).nanos_since(start), 0);
    assert_eq!(Timestamp::from_unix_nanos(3_500).nanos_since(start), 1_500);
    assert_eq!(Timestamp::from_unix_nanos(0).to_rfc3339(), "1970-01-01T00:00:00Z");
}

#[test]
fn record_columns_are_keyed_by_query_id() {
    let names: Vec<&str> = RECORD_COLUMNS.iter().map(|column| column.name).collect();

    assert_eq!(names.len(), 15);
    assert_eq!(names[3], "queryId");
    assert!(names.contains(&"schema"));
    assert!(names.contains(&"storage"));
}
