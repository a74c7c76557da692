// query-ledger-core/src/runtime/engine.rs
// ============================================================================
// Module: Query Ledger Engine Strategies
// Description: Per-backend artifact layout and tuple-count extraction.
// Purpose: Keep backend-specific branching behind one strategy per engine.
// Dependencies: crate::core, regex, thiserror
// ============================================================================

//! ## Overview
//! Each backend writes its side-channel artifacts to a fixed layout under a
//! base directory. An [`EngineStrategy`] knows where a backend puts the
//! schema, tuple count, and raw output for an artifact name, and how to pull
//! the tuple count out of it. Adding a backend means adding one strategy.
//!
//! Artifact reads are bounded; oversized files fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::ErrorKind;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::Backend;
use crate::core::ResultSchema;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a schema or count artifact in bytes.
pub const MAX_SMALL_ARTIFACT_BYTES: u64 = 1024 * 1024;
/// Maximum size of an execution log scanned for the tuple count.
pub const MAX_LOG_ARTIFACT_BYTES: u64 = 64 * 1024 * 1024;
/// Pattern locating the tuple count inside a binary-engine log.
const EMIT_COUNT_PATTERN: &str = r#""emit_count":\s*(\d+)"#;

/// Compiled [`EMIT_COUNT_PATTERN`], built on first use.
static EMIT_COUNT: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(EMIT_COUNT_PATTERN));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while reading backend artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    /// The artifact file does not exist.
    #[error("artifact not found: {}", .0.display())]
    Missing(PathBuf),
    /// The artifact could not be read.
    #[error("artifact io error at {}: {message}", path.display())]
    Io {
        /// Artifact path.
        path: PathBuf,
        /// Underlying error.
        message: String,
    },
    /// The artifact content is malformed.
    #[error("invalid artifact {}: {message}", path.display())]
    Invalid {
        /// Artifact path.
        path: PathBuf,
        /// Reason the content was rejected.
        message: String,
    },
}

// ============================================================================
// SECTION: Strategy
// ============================================================================

/// Artifact layout and count extraction for one backend.
pub trait EngineStrategy: Send + Sync {
    /// Backend served by this strategy.
    fn backend(&self) -> Backend;

    /// Path of the two-line schema artifact.
    fn schema_artifact(&self, name: &str) -> PathBuf;

    /// Path of the artifact holding the tuple count.
    fn count_artifact(&self, name: &str) -> PathBuf;

    /// Path of the raw result artifact.
    fn raw_output_artifact(&self, name: &str) -> PathBuf;

    /// Extracts the tuple count from the count artifact text.
    ///
    /// # Errors
    ///
    /// Returns a message describing why the content was rejected.
    fn parse_tuple_count(&self, content: &str) -> Result<i64, String>;

    /// Reads and parses the schema artifact.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the file is missing, unreadable, or
    /// malformed.
    fn read_schema(&self, name: &str) -> Result<ResultSchema, ArtifactError> {
        let path = self.schema_artifact(name);
        let content = read_bounded(&path, MAX_SMALL_ARTIFACT_BYTES)?;
        ResultSchema::parse_artifact(&content).map_err(|err| ArtifactError::Invalid {
            path,
            message: err.to_string(),
        })
    }

    /// Reads and parses the tuple count.
    ///
    /// # Errors
    ///
    /// Returns [`ArtifactError`] when the file is missing, unreadable, or
    /// holds no valid count.
    fn read_tuple_count(&self, name: &str) -> Result<i64, ArtifactError> {
        let path = self.count_artifact(name);
        let content = read_bounded(&path, MAX_LOG_ARTIFACT_BYTES)?;
        self.parse_tuple_count(&content).map_err(|message| ArtifactError::Invalid {
            path,
            message,
        })
    }
}

// ============================================================================
// SECTION: Ascii Engine
// ============================================================================

/// Text backend: `<base>/<name>.scheme`, `<base>/<name>.count`,
/// `<base>/<name>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsciiEngine {
    /// Directory holding every artifact of the backend.
    pub base_dir: PathBuf,
}

impl AsciiEngine {
    /// Creates the strategy rooted at `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }
}

impl EngineStrategy for AsciiEngine {
    fn backend(&self) -> Backend {
        Backend::AsciiEngine
    }

    fn schema_artifact(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.scheme"))
    }

    fn count_artifact(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.count"))
    }

    fn raw_output_artifact(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn parse_tuple_count(&self, content: &str) -> Result<i64, String> {
        let line = content.lines().next().unwrap_or_default().trim();
        parse_count(line)
    }
}

// ============================================================================
// SECTION: Binary Engine
// ============================================================================

/// Binary backend: `<base>/<name>.scheme`, `<base>/<name>.bin`, and a run log
/// at `<log_dir>/<prefix><name>.out` embedding `"emit_count": N`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryEngine {
    /// Directory holding schema and raw output artifacts.
    pub base_dir: PathBuf,
    /// Directory holding run logs.
    pub log_dir: PathBuf,
    /// Prefix prepended to the artifact name in log file names.
    pub log_prefix: String,
}

impl BinaryEngine {
    /// Creates the strategy with logs under `<base_dir>/logs`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>, log_prefix: impl Into<String>) -> Self {
        let base_dir = base_dir.into();
        let log_dir = base_dir.join("logs");
        Self {
            base_dir,
            log_dir,
            log_prefix: log_prefix.into(),
        }
    }

    /// Overrides the log directory.
    #[must_use]
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }
}

impl EngineStrategy for BinaryEngine {
    fn backend(&self) -> Backend {
        Backend::BinaryEngine
    }

    fn schema_artifact(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.scheme"))
    }

    fn count_artifact(&self, name: &str) -> PathBuf {
        self.log_dir.join(format!("{}{name}.out", self.log_prefix))
    }

    fn raw_output_artifact(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}.bin"))
    }

    fn parse_tuple_count(&self, content: &str) -> Result<i64, String> {
        let pattern = EMIT_COUNT.as_ref().map_err(ToString::to_string)?;
        let captures =
            pattern.captures(content).ok_or_else(|| "log has no emit_count field".to_string())?;
        let digits = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        parse_count(digits)
    }
}

// ============================================================================
// SECTION: Engine Set
// ============================================================================

/// Strategy for every known backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSet {
    /// Text backend strategy.
    pub ascii: AsciiEngine,
    /// Binary backend strategy.
    pub binary: BinaryEngine,
}

impl EngineSet {
    /// Creates the set from one strategy per backend.
    #[must_use]
    pub const fn new(ascii: AsciiEngine, binary: BinaryEngine) -> Self {
        Self {
            ascii,
            binary,
        }
    }

    /// Returns the strategy serving `backend`.
    #[must_use]
    pub fn strategy(&self, backend: Backend) -> &dyn EngineStrategy {
        match backend {
            Backend::AsciiEngine => &self.ascii,
            Backend::BinaryEngine => &self.binary,
        }
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Parses a non-negative tuple count.
fn parse_count(value: &str) -> Result<i64, String> {
    let count: i64 = value.parse().map_err(|_| format!("invalid tuple count: '{value}'"))?;
    if count < 0 {
        return Err(format!("negative tuple count: {count}"));
    }
    Ok(count)
}

/// Reads a UTF-8 artifact, failing when it exceeds `max_bytes`.
pub(crate) fn read_bounded(path: &Path, max_bytes: u64) -> Result<String, ArtifactError> {
    let file = File::open(path).map_err(|err| open_error(path, &err))?;
    let mut bytes = Vec::new();
    file.take(max_bytes.saturating_add(1)).read_to_end(&mut bytes).map_err(|err| {
        ArtifactError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    })?;
    if u64::try_from(bytes.len()).unwrap_or(u64::MAX) > max_bytes {
        return Err(ArtifactError::Invalid {
            path: path.to_path_buf(),
            message: format!("artifact exceeds {max_bytes} bytes"),
        });
    }
    String::from_utf8(bytes).map_err(|_| ArtifactError::Invalid {
        path: path.to_path_buf(),
        message: "artifact is not utf-8".to_string(),
    })
}

/// Maps a file open failure to an artifact error.
pub(crate) fn open_error(path: &Path, err: &std::io::Error) -> ArtifactError {
    if err.kind() == ErrorKind::NotFound {
        ArtifactError::Missing(path.to_path_buf())
    } else {
        ArtifactError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
