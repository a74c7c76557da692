// query-ledger-cli/src/runner.rs
// ============================================================================
// Module: Process Execution Runner
// Description: Runs backend queries as external processes.
// Purpose: Bridge the lifecycle controller to configured backend programs.
// Dependencies: query-ledger-core, query-ledger-config
// ============================================================================

//! ## Overview
//! [`ProcessRunner`] launches `program args... <label> <artifact>` in the
//! configured working directory and waits for it to exit. Standard output and
//! standard error are captured and concatenated so the lifecycle controller
//! can keep them as failure detail. No timeout is applied.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::Command;
use std::process::Stdio;

use query_ledger_config::LedgerConfig;
use query_ledger_core::Backend;
use query_ledger_core::ExecutionRunner;
use query_ledger_core::RunOutput;
use query_ledger_core::RunnerError;

// ============================================================================
// SECTION: Runner
// ============================================================================

/// Execution runner that spawns one process per backend run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRunner {
    /// Program to execute; runs fail when unset.
    program: Option<String>,
    /// Arguments placed before the label and artifact name.
    args: Vec<String>,
    /// Working directory of the process.
    working_dir: Option<PathBuf>,
    /// Label passed for the text backend.
    ascii_label: String,
    /// Label passed for the binary backend.
    binary_label: String,
}

impl ProcessRunner {
    /// Builds a runner from the `[runner]` and `[engines]` sections.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self {
            program: config.runner.program.clone(),
            args: config.runner.args.clone(),
            working_dir: config.runner.working_dir.clone(),
            ascii_label: config.runner_label(Backend::AsciiEngine).to_string(),
            binary_label: config.runner_label(Backend::BinaryEngine).to_string(),
        }
    }

    /// Returns the label passed for `backend`.
    fn label(&self, backend: Backend) -> &str {
        match backend {
            Backend::AsciiEngine => &self.ascii_label,
            Backend::BinaryEngine => &self.binary_label,
        }
    }
}

impl ExecutionRunner for ProcessRunner {
    fn run(&self, backend: Backend, artifact: &str) -> Result<RunOutput, RunnerError> {
        let program = self
            .program
            .as_deref()
            .ok_or_else(|| RunnerError::Spawn("runner.program is not configured".to_string()))?;
        let mut command = Command::new(program);
        command.args(&self.args).arg(self.label(backend)).arg(artifact).stdin(Stdio::null());
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        let output = command.output().map_err(|err| RunnerError::Spawn(err.to_string()))?;
        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);
        Ok(RunOutput {
            exit_code: output.status.code(),
            output: combined,
        })
    }
}
