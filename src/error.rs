//! Error definitions shared across subsystems.

use thiserror::Error;

/// Errors that can occur while building, mutating or reading the route tree
/// and while executing handlers.
#[derive(Debug, Error)]
pub enum ArborError {
    /// Malformed options or invalid route syntax. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A resolved node's backing file vanished without a tree update.
    /// Signals a surgeon/filesystem desync and must never be swallowed.
    #[error("index corruption: backing file missing for {raw_path}")]
    IndexCorruption { raw_path: String },

    /// The path is absent from the tree. Recoverable; the sync driver
    /// catches and ignores this when limbing already-removed paths.
    #[error("not planted: {0}")]
    NotPlanted(String),

    /// A per-file pipeline failure during sync. Isolated per file.
    #[error("transform failed for {path}: {reason}")]
    Transform { path: String, reason: String },

    /// Remote content fetch failed for one file.
    #[error("fetch failed for {path}: {reason}")]
    Fetch { path: String, reason: String },

    /// A dynamic handler returned an error.
    #[error("handler error for {path}: {reason}")]
    HandlerExecution { path: String, reason: String },

    /// A handler never signalled completion within the configured window.
    #[error("handler for {path} timed out after {secs}s")]
    HandlerTimeout { path: String, secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
