// query-ledger-cli/src/main.rs
// ============================================================================
// Module: Query Ledger CLI Entry Point
// Description: Command dispatcher for Query Ledger lifecycle and catalog calls.
// Purpose: Provide the `query-ledger <function> -p <params>` process surface.
// Dependencies: clap, query-ledger-cli, query-ledger-config, query-ledger-store-sqlite
// ============================================================================

//! ## Overview
//! Each invocation loads configuration, opens the `SQLite` store once, runs a
//! single function, and prints one line to stdout: a JSON document on
//! success or `error: <kind>: <message>` on a logical failure. The exit code
//! is non-zero only when configuration, the store, or stdout is unusable.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use query_ledger_cli::CommandContext;
use query_ledger_cli::CommandError;
use query_ledger_cli::Operation;
use query_ledger_cli::ProcessRunner;
use query_ledger_cli::audit::build_audit_sink;
use query_ledger_config::LedgerConfig;
use query_ledger_core::SystemClock;
use query_ledger_store_sqlite::SqliteQueryStore;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "query-ledger", disable_help_subcommand = true)]
struct Cli {
    /// Configuration file (overrides `QUERY_LEDGER_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Function to invoke, e.g. `submit` or `get-status`.
    #[arg(value_name = "FUNCTION")]
    function: String,
    /// Positional parameters of the function.
    #[arg(short = 'p', value_name = "PARAM", num_args = 1.., allow_hyphen_values = true)]
    params: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Fatal CLI error that aborts with a failure exit code.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Command context used by the binary.
type LedgerContext = CommandContext<SqliteQueryStore, ProcessRunner, SystemClock>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Parses arguments, executes the function, and prints its response.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let line = match cli.function.parse::<Operation>() {
        Ok(operation) => {
            let context = open_context(&cli)?;
            render_response(context.dispatch(operation, &cli.params))?
        }
        Err(err) => CommandError::from(err).tagged_line(),
    };
    write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration and builds the command context over the `SQLite` store.
fn open_context(cli: &Cli) -> CliResult<LedgerContext> {
    let config = LedgerConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let store = SqliteQueryStore::new(&config.sqlite_config())
        .map_err(|err| CliError::new(format!("failed to open store: {err}")))?;
    let audit = build_audit_sink(&config.audit)
        .map_err(|err| CliError::new(format!("failed to open audit log: {err}")))?;
    Ok(CommandContext::new(
        store,
        ProcessRunner::from_config(&config),
        SystemClock,
        config.engine_set(),
        audit,
    ))
}

/// Renders a command result as the single stdout line.
fn render_response(result: Result<Value, CommandError>) -> CliResult<String> {
    match result {
        Ok(value) => serde_json::to_string(&value)
            .map_err(|err| CliError::new(format!("failed to render response: {err}"))),
        Err(err) => Ok(err.tagged_line()),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
