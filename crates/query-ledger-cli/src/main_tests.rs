// query-ledger-cli/src/main_tests.rs
// ============================================================================
// Module: CLI Main Helpers Tests
// Description: Unit tests for argument parsing and response rendering.
// Purpose: Ensure the process surface keeps its one-line output contract.
// Dependencies: query-ledger-cli main helpers
// ============================================================================

//! ## Overview
//! Validates `Cli` parsing of `-p` parameter lists and the rendering of
//! successful and failed command results.

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
    reason = "Test-only output and panic-based assertions are permitted."
)]

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use clap::Parser;
use query_ledger_cli::CommandError;
use query_ledger_cli::UnknownOperation;
use serde_json::json;

use super::Cli;
use super::render_response;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn params_follow_a_single_flag() {
    let cli = Cli::try_parse_from([
        "query-ledger",
        "--config",
        "ledger.toml",
        "submit",
        "-p",
        "public_adhoc_edges",
        "http://host",
        "3",
        "ascii-engine",
        "scan%28edges%29",
    ])
    .expect("parse submit");

    assert_eq!(cli.function, "submit");
    assert_eq!(cli.config.as_deref(), Some(Path::new("ledger.toml")));
    assert_eq!(cli.params.len(), 5);
    assert_eq!(cli.params[4], "scan%28edges%29");
}

#[test]
fn params_may_look_like_negative_numbers() {
    let cli = Cli::try_parse_from(["query-ledger", "range-select", "-p", "-1", "0", "ascii-engine"])
        .expect("parse range-select");

    assert_eq!(cli.params, ["-1", "0", "ascii-engine"]);
}

#[test]
fn functions_without_params_parse() {
    let cli = Cli::try_parse_from(["query-ledger", "latest-id"]).expect("parse latest-id");

    assert!(cli.params.is_empty());
    assert!(cli.config.is_none());
}

#[test]
fn missing_function_is_a_usage_error() {
    assert!(Cli::try_parse_from(["query-ledger"]).is_err());
}

#[test]
fn success_renders_compact_json() {
    let line = render_response(Ok(json!({"numTuples": 42}))).expect("render");

    assert_eq!(line, r#"{"numTuples":42}"#);
}

#[test]
fn failure_renders_tagged_line() {
    let error = CommandError::from(UnknownOperation("select_all".to_string()));

    let line = render_response(Err(error)).expect("render");

    assert_eq!(line, "error: unknown_function: unknown function 'select_all'");
}
