//! Error types for datastore imports.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can stop an import.
///
/// During a run these are converted into an [`ImportResult`](crate::ImportResult)
/// carrying the rendered message. Only construction-time contract violations
/// are returned to the caller directly.
#[derive(Debug, Error)]
pub enum ImportError {
    // === Resource Errors ===
    /// The size probe failed (missing or unreadable file).
    #[error("file unavailable: {path}: {source}")]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resource is not textual.
    #[error("invalid mime type '{mime_type}' for {path}: only text resources can be imported")]
    InvalidMimeType { path: PathBuf, mime_type: String },

    /// Reading a chunk from an already opened file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // === Configuration Errors ===
    /// Import options that cannot drive a run.
    #[error("invalid import options: {message}")]
    InvalidOptions { message: String },

    // === Parsing Errors ===
    /// The parser rejected a chunk.
    #[error("failed to parse chunk {chunk}: {message}")]
    ParseFailure { chunk: u64, message: String },

    /// Two raw header strings in the same row are identical.
    #[error("duplicate header(s): {}", .duplicates.join(", "))]
    DuplicateHeader { duplicates: Vec<String> },

    // === Storage Errors ===
    /// The requested storage backend is not one of the known adapters.
    #[error("unsupported storage adapter: {kind}")]
    UnsupportedStorageAdapter { kind: String },

    /// The storage backend failed to accept a write.
    #[error("storage error: {message}")]
    Storage { message: String },

    // === Job State Errors ===
    /// Persisted job state could not be produced or restored.
    #[error("invalid job state: {message}")]
    State { message: String },
}

impl ImportError {
    /// True for errors raised before any byte of the resource is consumed.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::FileUnavailable { .. } | Self::InvalidMimeType { .. }
        )
    }
}

/// Result type for import operations.
pub type Result<T> = std::result::Result<T, ImportError>;
