//! Decoder and relation key property-based tests.
// query-ledger-core/tests/proptest_decoder.rs
// ============================================================================
// Module: Decoder Property-Based Tests
// Description: Randomized checks for binary grouping and key parsing.
// Purpose: Ensure decoding and key parsing hold for arbitrary inputs.
// ============================================================================

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

use std::fs;

use proptest::prelude::*;
use query_ledger_core::DecodeError;
use query_ledger_core::RelationKey;
use query_ledger_core::TupleStream;
use tempfile::TempDir;

proptest! {
    #[test]
    fn binary_tuples_preserve_values_in_order(
        columns in 1_usize .. 6,
        rows in prop::collection::vec(prop::collection::vec(any::<i64>(), 5), 0 .. 20),
    ) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");
        let values: Vec<i64> = rows.iter().flat_map(|row| row[.. columns].to_vec()).collect();
        let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
        fs::write(&path, bytes).unwrap();

        let tuples: Vec<String> =
            TupleStream::open_binary(&path, columns).unwrap().collect::<Result<_, _>>().unwrap();

        prop_assert_eq!(tuples.len(), rows.len());
        for (tuple, row) in tuples.iter().zip(&rows) {
            let parsed: Vec<i64> = tuple.split(' ').map(|part| part.parse().unwrap()).collect();
            prop_assert_eq!(&parsed[..], &row[.. columns]);
        }
    }

    #[test]
    fn ragged_binary_lengths_fail_to_open(columns in 1_usize .. 6, extra in 1_usize .. 48) {
        prop_assume!(extra % (columns * 8) != 0);
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.bin");
        fs::write(&path, vec![0_u8; columns * 8 * 3 + extra]).unwrap();

        prop_assert!(matches!(TupleStream::open_binary(&path, columns), Err(DecodeError::Decode(_))));
    }

    #[test]
    fn text_tuples_match_non_empty_lines(lines in prop::collection::vec("[a-z0-9 ,]{0,12}", 0 .. 20)) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out");
        fs::write(&path, lines.join("\n")).unwrap();

        let tuples: Vec<String> =
            TupleStream::open_text(&path).unwrap().collect::<Result<_, _>>().unwrap();

        let expected: Vec<String> = lines.into_iter().filter(|line| !line.is_empty()).collect();
        prop_assert_eq!(tuples, expected);
    }

    #[test]
    fn relation_keys_round_trip_through_joined_form(
        user in "[a-z0-9]{1,8}",
        program in "[a-z0-9]{1,8}",
        relation in "[a-z0-9_]{1,16}",
    ) {
        let key = RelationKey::from_parts(&user, &program, &relation).unwrap();

        prop_assert_eq!(RelationKey::parse_joined(&key.joined()).unwrap(), key);
    }
}
