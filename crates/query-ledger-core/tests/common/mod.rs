// query-ledger-core/tests/common/mod.rs
// ============================================================================
// Module: Query Ledger Test Helpers
// Description: Shared fixtures for Query Ledger core tests.
// Purpose: Provide scripted runners, artifact writers, and record builders.
// Dependencies: query-ledger-core
// ============================================================================

//! ## Overview
//! Shared fixtures for the core integration suites. The scripted runner
//! never spawns processes; tests write backend artifacts directly.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use query_ledger_core::AsciiEngine;
use query_ledger_core::Backend;
use query_ledger_core::BinaryEngine;
use query_ledger_core::EngineSet;
use query_ledger_core::ExecutionRunner;
use query_ledger_core::QueryId;
use query_ledger_core::QueryRecord;
use query_ledger_core::QueryStatus;
use query_ledger_core::RelationKey;
use query_ledger_core::ResultSchema;
use query_ledger_core::RunOutput;
use query_ledger_core::RunnerError;
use query_ledger_core::SubmitRequest;
use query_ledger_core::Timestamp;

/// Log prefix used by the binary engine in tests.
pub const LOG_PREFIX: &str = "bin_";

/// Engine set rooted at `dir`, logs under `dir/logs`.
pub fn engines(dir: &Path) -> EngineSet {
    EngineSet::new(AsciiEngine::new(dir), BinaryEngine::new(dir, LOG_PREFIX))
}

/// Relation key owned by the `public` user of the `adhoc` program.
pub fn key(relation: &str) -> RelationKey {
    RelationKey::new("public", "adhoc", relation)
}

/// Submission for `relation` on `backend`.
pub fn submit_request(query_id: u64, backend: Backend, relation: &str) -> SubmitRequest {
    SubmitRequest {
        relation_key: key(relation),
        url: "http://localhost:8753".to_string(),
        query_id: QueryId::new(query_id),
        backend,
        raw_query: "T1 = scan(R); store(T1, OUT);".to_string(),
    }
}

/// Finished record with the given schema.
pub fn success_record(
    query_id: u64,
    backend: Backend,
    relation: &str,
    schema: ResultSchema,
) -> QueryRecord {
    let at = Timestamp::from_unix_nanos(1_000);
    QueryRecord {
        relation_key: key(relation),
        query_id: QueryId::new(query_id),
        created: at,
        url: "http://localhost:8753".to_string(),
        status: QueryStatus::Success,
        start_time: at,
        end_time: Some(at),
        elapsed_nanos: 0,
        num_tuples: 0,
        schema,
        backend,
        query: "query".to_string(),
        storage: backend.storage(),
    }
}

/// Two-column integer schema.
pub fn pair_schema() -> ResultSchema {
    ResultSchema::new(
        vec!["a".to_string(), "b".to_string()],
        vec!["LONG_TYPE".to_string(), "LONG_TYPE".to_string()],
    )
}

/// Writes a schema artifact in list-literal form.
pub fn write_schema(dir: &Path, name: &str, names: &[&str], types: &[&str]) {
    let render = |items: &[&str]| {
        let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
        format!("[{}]", quoted.join(", "))
    };
    fs::write(dir.join(format!("{name}.scheme")), format!("{}\n{}\n", render(names), render(types)))
        .unwrap();
}

/// Writes the ascii engine count artifact.
pub fn write_ascii_count(dir: &Path, name: &str, count: &str) {
    fs::write(dir.join(format!("{name}.count")), count).unwrap();
}

/// Writes the binary engine run log.
pub fn write_binary_log(dir: &Path, name: &str, body: &str) {
    let logs = dir.join("logs");
    fs::create_dir_all(&logs).unwrap();
    fs::write(logs.join(format!("{LOG_PREFIX}{name}.out")), body).unwrap();
}

/// Writes little-endian `i64` values as a binary result artifact.
pub fn write_binary_values(path: &Path, values: &[i64]) {
    let bytes: Vec<u8> = values.iter().flat_map(|value| value.to_le_bytes()).collect();
    fs::write(path, bytes).unwrap();
}

/// Runner returning a fixed result and remembering its calls.
#[derive(Clone)]
pub struct ScriptedRunner {
    /// Result returned by every run.
    result: Result<RunOutput, RunnerError>,
    /// Calls received so far.
    calls: Arc<Mutex<Vec<(Backend, String)>>>,
}

impl ScriptedRunner {
    /// Runner whose backend exits with `code`.
    pub fn exiting(code: i32, output: &str) -> Self {
        Self {
            result: Ok(RunOutput {
                exit_code: Some(code),
                output: output.as_bytes().to_vec(),
            }),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Runner whose backend exits cleanly.
    pub fn succeeding() -> Self {
        Self::exiting(0, "")
    }

    /// Runner that cannot start the backend.
    pub fn unspawnable() -> Self {
        Self {
            result: Err(RunnerError::Spawn("no such program".to_string())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<(Backend, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl ExecutionRunner for ScriptedRunner {
    fn run(&self, backend: Backend, artifact: &str) -> Result<RunOutput, RunnerError> {
        self.calls.lock().unwrap().push((backend, artifact.to_string()));
        self.result.clone()
    }
}
