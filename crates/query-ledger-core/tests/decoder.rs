// query-ledger-core/tests/decoder.rs
// ============================================================================
// Module: Result Decoder Tests
// Description: Text and binary result materialization coverage.
// Purpose: Ensure both encodings decode to the same tuple representation.
// Dependencies: query-ledger-core, serde_json, tempfile
// ============================================================================
//! ## Overview
//! Covers the schema-first element layout, blank-line skipping, binary
//! grouping, and the failure taxonomy of the decoder.

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

mod common;

use std::fs;

use query_ledger_core::Backend;
use query_ledger_core::DecodeError;
use query_ledger_core::InMemoryQueryStore;
use query_ledger_core::QueryId;
use query_ledger_core::QueryRecordStore;
use query_ledger_core::QueryStatus;
use query_ledger_core::ResultDecoder;
use query_ledger_core::ResultElement;
use query_ledger_core::ResultSchema;
use query_ledger_core::StoreError;
use query_ledger_core::TupleStream;
use serde_json::json;
use tempfile::TempDir;

use crate::common::engines;
use crate::common::pair_schema;
use crate::common::success_record;
use crate::common::write_binary_values;

fn decoder(dir: &TempDir) -> (ResultDecoder<InMemoryQueryStore>, InMemoryQueryStore) {
    let store = InMemoryQueryStore::new();
    (ResultDecoder::new(store.clone(), engines(dir.path())), store)
}

fn tuples(elements: &[ResultElement]) -> Vec<String> {
    elements
        .iter()
        .filter_map(|element| match element {
            ResultElement::Tuple {
                tuple,
            } => Some(tuple.clone()),
            ResultElement::Schema(_) => None,
        })
        .collect()
}

#[test]
fn text_results_skip_blank_lines() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::AsciiEngine, "out", pair_schema())).unwrap();
    fs::write(dir.path().join("out"), "1 2\n3 4\n\n").unwrap();

    let elements = decoder.decode(QueryId::new(0)).unwrap().into_elements().unwrap();

    assert_eq!(elements[0], ResultElement::Schema(pair_schema()));
    assert_eq!(tuples(&elements), vec!["1 2", "3 4"]);
}

#[test]
fn text_results_keep_lines_verbatim() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::AsciiEngine, "out", ResultSchema::empty())).unwrap();
    fs::write(dir.path().join("out"), "  padded ,x\nlast-without-newline").unwrap();

    let elements = decoder.decode(QueryId::new(0)).unwrap().into_elements().unwrap();

    assert_eq!(tuples(&elements), vec!["  padded ,x", "last-without-newline"]);
}

#[test]
fn binary_results_group_words_by_column_count() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::BinaryEngine, "edges", pair_schema())).unwrap();
    write_binary_values(&dir.path().join("edges.bin"), &[1, -2, 3, i64::MAX, 0, i64::MIN]);

    let elements = decoder.decode(QueryId::new(0)).unwrap().into_elements().unwrap();

    assert_eq!(
        tuples(&elements),
        vec!["1 -2".to_string(), format!("3 {}", i64::MAX), format!("0 {}", i64::MIN)]
    );
}

#[test]
fn empty_binary_file_yields_only_the_schema() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::BinaryEngine, "edges", pair_schema())).unwrap();
    write_binary_values(&dir.path().join("edges.bin"), &[]);

    let elements = decoder.decode(QueryId::new(0)).unwrap().into_elements().unwrap();

    assert_eq!(elements, vec![ResultElement::Schema(pair_schema())]);
}

#[test]
fn binary_length_not_multiple_of_tuple_width_fails() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::BinaryEngine, "edges", pair_schema())).unwrap();
    let path = dir.path().join("edges.bin");
    let mut bytes: Vec<u8> = (0 .. 3 * 2).flat_map(|value: i64| value.to_le_bytes()).collect();
    bytes.extend_from_slice(&[1, 2, 3]);
    fs::write(&path, bytes).unwrap();

    let err = decoder.decode(QueryId::new(0)).unwrap_err();
    assert!(matches!(err, DecodeError::Decode(_)));

    write_binary_values(&path, &[1, 2, 3]);
    let err = decoder.decode(QueryId::new(0)).unwrap_err();
    assert!(matches!(err, DecodeError::Decode(_)));
}

#[test]
fn binary_results_need_a_schema() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(4, Backend::BinaryEngine, "edges", ResultSchema::empty())).unwrap();
    write_binary_values(&dir.path().join("edges.bin"), &[1]);

    let err = decoder.decode(QueryId::new(4)).unwrap_err();

    assert!(matches!(err, DecodeError::SchemaUnavailable(id) if id == QueryId::new(4)));
}

#[test]
fn missing_artifact_is_reported() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::AsciiEngine, "absent", pair_schema())).unwrap();

    let err = decoder.decode(QueryId::new(0)).unwrap_err();

    assert!(matches!(err, DecodeError::ArtifactNotFound(path) if path.ends_with("absent")));
}

#[test]
fn unfinished_and_unknown_records_are_rejected() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    let mut record = success_record(0, Backend::AsciiEngine, "out", pair_schema());
    record.status = QueryStatus::Running;
    record.end_time = None;
    store.insert(&record).unwrap();

    assert!(matches!(
        decoder.decode(QueryId::new(0)),
        Err(DecodeError::NotSucceeded {
            status: QueryStatus::Running,
            ..
        })
    ));
    assert!(matches!(
        decoder.decode(QueryId::new(1)),
        Err(DecodeError::Store(StoreError::NotFound(_)))
    ));
}

#[test]
fn decoding_twice_restarts_the_sequence() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::AsciiEngine, "out", pair_schema())).unwrap();
    fs::write(dir.path().join("out"), "a\nb\n").unwrap();

    let mut first = decoder.decode(QueryId::new(0)).unwrap().tuples;
    assert_eq!(first.next().unwrap().unwrap(), "a");
    let second: Vec<String> =
        decoder.decode(QueryId::new(0)).unwrap().tuples.collect::<Result<_, _>>().unwrap();

    assert_eq!(second, vec!["a", "b"]);
}

#[test]
fn stream_stops_after_trailing_partial_value() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("raw.bin");
    write_binary_values(&path, &[7]);
    let stream = TupleStream::open_binary(&path, 1).unwrap();
    fs::write(&path, [0_u8; 12]).unwrap();

    let results: Vec<Result<String, DecodeError>> = stream.collect();

    assert!(results.last().is_some_and(Result::is_err));
    assert!(results.len() <= 2);
}

#[test]
fn elements_serialize_schema_first() {
    let dir = TempDir::new().unwrap();
    let (decoder, store) = decoder(&dir);
    store.insert(&success_record(0, Backend::AsciiEngine, "out", pair_schema())).unwrap();
    fs::write(dir.path().join("out"), "1 2\n").unwrap();

    let elements = decoder.decode(QueryId::new(0)).unwrap().into_elements().unwrap();

    assert_eq!(
        serde_json::to_value(elements).unwrap(),
        json!([
            {"columnNames": ["a", "b"], "columnTypes": ["LONG_TYPE", "LONG_TYPE"]},
            {"tuple": "1 2"}
        ])
    );
}
