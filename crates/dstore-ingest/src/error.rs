//! Error types for parser adapters.

use thiserror::Error;

use dstore_model::ImportError;

use crate::adapter::ParserKind;

/// Errors raised while decoding input.
#[derive(Debug, Error)]
pub enum ParserError {
    /// A record contained bytes that are not valid UTF-8.
    #[error("record {record} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        record: u64,
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// A record had a different number of fields than the header.
    #[error("record {record} has {found} fields, expected {expected}")]
    UnequalLengths {
        record: u64,
        expected: usize,
        found: usize,
    },

    /// Input was fed after `finish()`.
    #[error("parser already finished")]
    Finished,

    /// Saved state belongs to a different parser.
    #[error("cannot restore {found} parser state into a {expected} parser")]
    StateMismatch {
        expected: ParserKind,
        found: ParserKind,
    },

    /// Saved state cannot be replayed.
    #[error("corrupt parser state: {message}")]
    CorruptState { message: String },

    /// Unknown parser kind tag.
    #[error("unknown parser kind: {0}")]
    UnknownKind(String),
}

impl ParserError {
    /// Wrap as an import failure for the given chunk.
    pub fn into_import_error(self, chunk: u64) -> ImportError {
        ImportError::ParseFailure {
            chunk,
            message: self.to_string(),
        }
    }
}

/// Result type for parser operations.
pub type Result<T> = std::result::Result<T, ParserError>;
