// query-ledger-config/src/config.rs
// ============================================================================
// Module: Query Ledger Configuration
// Description: Configuration loading and validation for Query Ledger.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: query-ledger-core, query-ledger-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is resolved from an explicit path, then the
//! `QUERY_LEDGER_CONFIG` environment variable, then `query-ledger.toml` in the
//! working directory. Only the last of these may be absent, in which case the
//! built-in defaults apply. Every section is optional.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;

use query_ledger_core::AsciiEngine;
use query_ledger_core::Backend;
use query_ledger_core::BinaryEngine;
use query_ledger_core::EngineSet;
use query_ledger_store_sqlite::SqliteStoreConfig;
use query_ledger_store_sqlite::SqliteStoreMode;
use query_ledger_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "query-ledger.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "QUERY_LEDGER_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum number of extra runner arguments.
pub(crate) const MAX_RUNNER_ARGS: usize = 64;
/// Maximum length of a single runner argument or label.
pub(crate) const MAX_RUNNER_ARG_LENGTH: usize = 1024;
/// Maximum `SQLite` busy timeout in milliseconds.
pub(crate) const MAX_BUSY_TIMEOUT_MS: u64 = 60_000;
/// Default `SQLite` database file name.
const DEFAULT_STORE_PATH: &str = "query-ledger.db";
/// Default log file prefix for the binary engine.
const DEFAULT_BINARY_LOG_PREFIX: &str = "binary_";

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// Query Ledger configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    /// Record store configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Per-backend artifact layout.
    #[serde(default)]
    pub engines: EnginesConfig,
    /// Backend process launch configuration.
    #[serde(default)]
    pub runner: RunnerConfig,
    /// Lifecycle audit logging configuration.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl LedgerConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when an explicit path is missing, or loading
    /// or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match resolve_path(path)? {
            ConfigSource::Explicit(path) => Self::load_file(&path),
            ConfigSource::Default(path) => Self::load_or_default(&path),
        }
    }

    /// Loads configuration from `path`, or returns the built-in defaults when
    /// no file exists there.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file exists but cannot be loaded or
    /// fails validation.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        match fs::metadata(path) {
            Ok(_) => Self::load_file(path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
            Err(err) => Err(ConfigError::Io(err.to_string())),
        }
    }

    /// Loads and validates the configuration file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read, parsed, or
    /// validated.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        validate_path(path)?;
        let bytes = fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.store.validate()?;
        self.engines.validate()?;
        self.runner.validate()?;
        self.audit.validate()
    }

    /// Builds the per-backend artifact strategies.
    #[must_use]
    pub fn engine_set(&self) -> EngineSet {
        self.engines.engine_set()
    }

    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        self.store.sqlite_config()
    }

    /// Returns the label passed to the runner for `backend`.
    #[must_use]
    pub fn runner_label(&self, backend: Backend) -> &str {
        match backend {
            Backend::AsciiEngine => self.engines.ascii.runner_label.as_deref(),
            Backend::BinaryEngine => self.engines.binary.runner_label.as_deref(),
        }
        .unwrap_or_else(|| backend.as_str())
    }
}

/// Record store configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// `SQLite` database path.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_store_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_value("store.path", &self.path)?;
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }

    /// Returns the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }
}

/// Per-backend artifact layout.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnginesConfig {
    /// Text engine layout.
    #[serde(default)]
    pub ascii: AsciiEngineConfig,
    /// Binary engine layout.
    #[serde(default)]
    pub binary: BinaryEngineConfig,
}

impl EnginesConfig {
    /// Validates engine configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.ascii.validate()?;
        self.binary.validate()
    }

    /// Builds the per-backend artifact strategies.
    #[must_use]
    pub fn engine_set(&self) -> EngineSet {
        let ascii = AsciiEngine::new(self.ascii.artifact_dir.clone());
        let mut binary =
            BinaryEngine::new(self.binary.artifact_dir.clone(), self.binary.log_prefix.clone());
        if let Some(log_dir) = &self.binary.log_dir {
            binary = binary.with_log_dir(log_dir.clone());
        }
        EngineSet::new(ascii, binary)
    }
}

/// Text engine layout.
#[derive(Debug, Clone, Deserialize)]
pub struct AsciiEngineConfig {
    /// Directory holding schema, count, and raw output artifacts.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Label passed to the runner; defaults to the backend label.
    #[serde(default)]
    pub runner_label: Option<String>,
}

impl Default for AsciiEngineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            runner_label: None,
        }
    }
}

impl AsciiEngineConfig {
    /// Validates text engine configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_value("engines.ascii.artifact_dir", &self.artifact_dir)?;
        if let Some(label) = &self.runner_label {
            validate_token("engines.ascii.runner_label", label)?;
        }
        Ok(())
    }
}

/// Binary engine layout.
#[derive(Debug, Clone, Deserialize)]
pub struct BinaryEngineConfig {
    /// Directory holding schema and raw output artifacts.
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
    /// Directory holding run logs; defaults to `<artifact_dir>/logs`.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// File name prefix of run logs.
    #[serde(default = "default_binary_log_prefix")]
    pub log_prefix: String,
    /// Label passed to the runner; defaults to the backend label.
    #[serde(default)]
    pub runner_label: Option<String>,
}

impl Default for BinaryEngineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
            log_dir: None,
            log_prefix: default_binary_log_prefix(),
            runner_label: None,
        }
    }
}

impl BinaryEngineConfig {
    /// Validates binary engine configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_value("engines.binary.artifact_dir", &self.artifact_dir)?;
        if let Some(log_dir) = &self.log_dir {
            validate_path_value("engines.binary.log_dir", log_dir)?;
        }
        if self.log_prefix.len() > MAX_PATH_COMPONENT_LENGTH
            || self.log_prefix.contains(['/', '\\'])
        {
            return Err(ConfigError::Invalid(
                "engines.binary.log_prefix must be a plain file name prefix".to_string(),
            ));
        }
        if let Some(label) = &self.runner_label {
            validate_token("engines.binary.runner_label", label)?;
        }
        Ok(())
    }
}

/// Backend process launch configuration.
///
/// A backend run executes `program args... <runner label> <artifact>` in
/// `working_dir`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunnerConfig {
    /// Program to execute; runs fail when unset.
    #[serde(default)]
    pub program: Option<String>,
    /// Arguments placed before the runner label and artifact name.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory of the backend process.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl RunnerConfig {
    /// Validates runner configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(program) = &self.program {
            validate_token("runner.program", program)?;
        }
        if self.args.len() > MAX_RUNNER_ARGS {
            return Err(ConfigError::Invalid(format!(
                "runner.args must have at most {MAX_RUNNER_ARGS} entries"
            )));
        }
        if self.args.iter().any(|arg| arg.len() > MAX_RUNNER_ARG_LENGTH) {
            return Err(ConfigError::Invalid("runner.args entry exceeds max length".to_string()));
        }
        if let Some(dir) = &self.working_dir {
            validate_path_value("runner.working_dir", dir)?;
        }
        Ok(())
    }
}

/// Lifecycle audit logging configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditConfig {
    /// Audit sink selection.
    #[serde(default)]
    pub sink: AuditSinkKind,
    /// JSON-lines log path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl AuditConfig {
    /// Validates audit configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (AuditSinkKind::File, None) => {
                Err(ConfigError::Invalid("file audit sink requires audit.path".to_string()))
            }
            (AuditSinkKind::File, Some(path)) => validate_path_value("audit.path", path),
            (AuditSinkKind::Stderr | AuditSinkKind::None, Some(_)) => Err(ConfigError::Invalid(
                "audit.path is only valid with the file audit sink".to_string(),
            )),
            (AuditSinkKind::Stderr | AuditSinkKind::None, None) => Ok(()),
        }
    }
}

/// Audit sink types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuditSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to `audit.path`.
    File,
    /// Discard events.
    None,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Where the configuration path came from.
enum ConfigSource {
    /// Named by the caller or the environment; must exist.
    Explicit(PathBuf),
    /// The default file name; may be absent.
    Default(PathBuf),
}

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<ConfigSource, ConfigError> {
    if let Some(path) = path {
        return Ok(ConfigSource::Explicit(path.to_path_buf()));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(ConfigSource::Explicit(PathBuf::from(env_path)));
    }
    Ok(ConfigSource::Default(PathBuf::from(DEFAULT_CONFIG_NAME)))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path against length constraints.
fn validate_path_value(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates a non-empty, bounded command token.
fn validate_token(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if value.len() > MAX_RUNNER_ARG_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Default `SQLite` database path.
fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Default busy timeout for the `SQLite` store (ms).
pub(crate) const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default artifact directory.
fn default_artifact_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Default binary engine log prefix.
fn default_binary_log_prefix() -> String {
    DEFAULT_BINARY_LOG_PREFIX.to_string()
}
