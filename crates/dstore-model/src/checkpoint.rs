//! Progress counters and import status.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Persisted progress of an import.
///
/// Both counters only move forward, and only at chunk boundaries after the
/// chunk's records have been stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Number of fixed-size chunks fed to the parser and committed.
    pub chunks_processed: u64,
    /// Number of decoded rows drained so far, header included.
    pub record_number: u64,
}

impl Checkpoint {
    pub fn new(chunks_processed: u64, record_number: u64) -> Self {
        Self {
            chunks_processed,
            record_number,
        }
    }

    /// True until the first chunk has been committed.
    pub fn is_unstarted(&self) -> bool {
        self.chunks_processed == 0
    }

    /// Byte offset to resume reading from.
    ///
    /// The final chunk of a file is usually shorter than `chunk_size`, so the
    /// product is clamped to the file size.
    pub fn bytes_processed(&self, chunk_size: usize, file_size: u64) -> u64 {
        self.chunks_processed
            .saturating_mul(chunk_size as u64)
            .min(file_size)
    }
}

/// Status of an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportStatus {
    /// More input remains (or the budget ran out). Re-entrant.
    #[default]
    Stopped,
    /// Terminal success.
    Done,
    /// Terminal failure.
    Error,
}

impl ImportStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportStatus::Done | ImportStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::Stopped => "STOPPED",
            ImportStatus::Done => "DONE",
            ImportStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the most recent run, with error detail when failed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    status: ImportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ImportResult {
    pub fn new(status: ImportStatus, error: Option<String>) -> Self {
        Self { status, error }
    }

    pub fn stopped() -> Self {
        Self::new(ImportStatus::Stopped, None)
    }

    pub fn done() -> Self {
        Self::new(ImportStatus::Done, None)
    }

    pub fn failed(error: &ImportError) -> Self {
        Self::new(ImportStatus::Error, Some(error.to_string()))
    }

    pub fn status(&self) -> ImportStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
