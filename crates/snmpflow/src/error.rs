//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use snmpflow_config::ConfigError;
use snmpflow_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const INPUT: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("No classifier database configured")]
    #[diagnostic(
        code(snmpflow::no_mib_db),
        help(
            "Set mib_db in the config file or pass --db.\n\
             Config file: {path}"
        )
    )]
    NoMibDb { path: String },

    #[error("No devices configured")]
    #[diagnostic(
        code(snmpflow::no_devices),
        help("Add at least one [[devices]] entry to {path}")
    )]
    NoDevices { path: String },

    #[error("Configuration could not be loaded: {message}")]
    #[diagnostic(
        code(snmpflow::config),
        help("Environment overrides use the SNMPFLOW_ prefix; nested keys use '__'.")
    )]
    Config { message: String },

    // ── Input files ──────────────────────────────────────────────────

    #[error("Cannot read {path}")]
    #[diagnostic(code(snmpflow::unreadable))]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed file {path}: {message}")]
    #[diagnostic(code(snmpflow::malformed))]
    Malformed { path: String, message: String },

    #[error("Classifier database error: {message}")]
    #[diagnostic(
        code(snmpflow::database),
        help("The database needs a table mibs(oid, template, provider, description).")
    )]
    Database { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(snmpflow::validation))]
    Validation { field: String, reason: String },

    #[error("Invalid OID '{oid}': {reason}")]
    #[diagnostic(
        code(snmpflow::invalid_oid),
        help("OIDs are dotted decimal, e.g. .1.3.6.1.4.1.9.1.1208")
    )]
    InvalidOid { oid: String, reason: String },

    // ── Runtime ──────────────────────────────────────────────────────

    #[error("Operation not supported: {operation}")]
    #[diagnostic(code(snmpflow::unsupported))]
    Unsupported { operation: String },

    #[error("Output error: {message}")]
    #[diagnostic(code(snmpflow::sink))]
    Sink { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(snmpflow::internal))]
    Internal { message: String },

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON encoding failed: {0}")]
    #[diagnostic(code(snmpflow::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML encoding failed: {0}")]
    #[diagnostic(code(snmpflow::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoMibDb { .. } | Self::NoDevices { .. } | Self::Config { .. } => {
                exit_code::CONFIG
            }
            Self::Unreadable { .. } | Self::Malformed { .. } | Self::Database { .. } => {
                exit_code::INPUT
            }
            Self::Validation { .. } | Self::InvalidOid { .. } => exit_code::USAGE,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Closed => Self::Database {
                message: "database is closed".into(),
            },
            CoreError::Database(e) => Self::Database {
                message: e.to_string(),
            },
            CoreError::InvalidOid { oid, reason } => Self::InvalidOid { oid, reason },
            CoreError::Io { path, source } => Self::Unreadable {
                path: path.display().to_string(),
                source,
            },
            CoreError::Parse { path, message } => Self::Malformed {
                path: path.display().to_string(),
                message,
            },
            CoreError::Config { message } => Self::Config { message },
            CoreError::Unsupported { operation } => Self::Unsupported { operation },
            CoreError::Sink { message } => Self::Sink { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Io(source) => Self::Config {
                message: source.to_string(),
            },
            other => Self::Config {
                message: other.to_string(),
            },
        }
    }
}

impl From<tokio::task::JoinError> for CliError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}
