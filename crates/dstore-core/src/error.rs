//! Error types for job configuration and the job runner.

use std::path::PathBuf;
use thiserror::Error;

use dstore_model::ImportError;
use dstore_storage::StorageError;

/// Errors raised outside of a run: loading options, saving and loading job
/// state, opening adapters.
#[derive(Debug, Error)]
pub enum CoreError {
    // === File System Errors ===
    /// File I/O error.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Options file is not valid TOML for [`ImportOptions`](crate::ImportOptions).
    #[error("failed to parse options file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Options failed validation.
    #[error("invalid options: {message}")]
    InvalidOptions { message: String },

    // === Job Errors ===
    /// No saved job state exists and no resource was given to start one.
    #[error("no job state at {path} and no resource to start a new import")]
    MissingResource { path: PathBuf },

    /// Contract violation from the engine or an adapter.
    #[error(transparent)]
    Import(#[from] ImportError),
}

impl CoreError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        Self::Import(err.into())
    }
}

/// Result type for runner and configuration operations.
pub type Result<T> = std::result::Result<T, CoreError>;
