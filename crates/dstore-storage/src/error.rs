//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

use dstore_model::ImportError;

/// Errors raised by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// File I/O error.
    #[error("failed to {operation} {path}: {source}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored entry could not be encoded or decoded.
    #[error("failed to encode storage entry: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A line of the record log is not a valid entry.
    #[error("corrupt record log {path} at line {line}: {message}")]
    CorruptLog {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// A different schema was already committed to this storage.
    #[error("schema already set with fields [{existing}], refusing [{incoming}]")]
    SchemaConflict { existing: String, incoming: String },

    /// Unknown storage kind tag.
    #[error("unknown storage kind: {0}")]
    UnknownKind(String),

    /// The storage kind needs a location on disk.
    #[error("{kind} storage requires a directory")]
    MissingLocation { kind: &'static str },
}

impl StorageError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<StorageError> for ImportError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnknownKind(kind) => ImportError::UnsupportedStorageAdapter { kind },
            other => ImportError::Storage {
                message: other.to_string(),
            },
        }
    }
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
