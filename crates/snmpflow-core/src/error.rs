// ── Core error types ──
//
// Store-level and startup errors surface as `CoreError`. Per-cycle
// protocol trouble is a `PollError`: it is logged by the device loop
// and never propagates past it.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Classifier store ─────────────────────────────────────────────
    #[error("Classifier database is closed")]
    Closed,

    #[error("Classifier database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid OID '{oid}': {reason}")]
    InvalidOid { oid: String, reason: String },

    // ── File loading ─────────────────────────────────────────────────
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Operation not supported: {operation}")]
    Unsupported { operation: String },

    #[error("Sink error: {message}")]
    Sink { message: String },
}

impl CoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// A failed collection attempt against one device.
///
/// Recoverable: the device loop discards its delta state and waits for
/// the next tick.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PollError {
    #[error("request to {target} timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    #[error("protocol error from {target}: {message}")]
    Protocol { target: String, message: String },

    #[error("device {target} unavailable: {reason}")]
    Unavailable { target: String, reason: String },
}
