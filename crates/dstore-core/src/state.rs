//! Persisted job state.
//!
//! Everything needed to continue an import in a later process: the resource,
//! committed counters, last result, parser buffer and the tag of the storage
//! backend. Serialized as camelCase JSON:
//!
//! ```json
//! {
//!   "chunksProcessed": 3,
//!   "recordNumber": 41,
//!   "status": "STOPPED",
//!   "error": null,
//!   "resource": {"id": "1", "filePath": "/data/bikes.csv", "mimeType": "text/csv"},
//!   "parserState": {"kind": "csv", ...},
//!   "chunkSize": 8192,
//!   "storage": "log"
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use dstore_ingest::ParserState;
use dstore_model::{Checkpoint, ImportError, ImportResult, ImportStatus, Resource, Result};
use dstore_storage::{StorageAdapter, StorageKind};

use crate::engine::ImportEngine;
use crate::factory::build_storage;
use crate::options::ImportOptions;

fn default_storage() -> String {
    StorageKind::Memory.as_str().to_string()
}

/// Serializable snapshot of an [`ImportEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobState {
    pub chunks_processed: u64,
    pub record_number: u64,
    pub status: ImportStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub resource: Resource,
    pub parser_state: ParserState,
    pub chunk_size: usize,
    /// Storage kind tag. Kept as text so an unknown backend is reported as
    /// an unsupported adapter rather than a malformed document.
    #[serde(default = "default_storage")]
    pub storage: String,
}

impl JobState {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ImportError::State {
            message: e.to_string(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ImportError::State {
            message: e.to_string(),
        })
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.chunks_processed, self.record_number)
    }

    pub fn result(&self) -> ImportResult {
        ImportResult::new(self.status, self.error.clone())
    }

    /// Resolve the storage tag.
    pub fn storage_kind(&self) -> Result<StorageKind> {
        self.storage
            .parse::<StorageKind>()
            .map_err(ImportError::from)
    }

    /// Reopen the storage named by the tag and rebuild the engine.
    ///
    /// A job that is still in progress can only be reopened from durable
    /// storage. Records kept in memory by an earlier process are gone, and
    /// resuming would finish the import without them.
    pub fn open(self, storage_location: Option<&Path>, options: ImportOptions) -> Result<ImportEngine> {
        let kind = self.storage_kind()?;
        if !kind.is_durable() && !self.checkpoint().is_unstarted() && !self.status.is_terminal() {
            return Err(ImportError::State {
                message: format!(
                    "import of '{}' stopped after {} chunks in {kind} storage, which does not survive a restart; drop it and import again",
                    self.resource.id(),
                    self.chunks_processed
                ),
            });
        }
        let storage = build_storage(kind.as_str(), storage_location)?;
        self.into_engine(storage, options)
    }

    /// Rebuild the engine around an already opened storage backend.
    ///
    /// The saved chunk size always wins over `options`, since the committed
    /// byte offset is only meaningful with the size it was counted in.
    pub fn into_engine(self, storage: Box<dyn StorageAdapter>, options: ImportOptions) -> Result<ImportEngine> {
        let expected = self.storage_kind()?;
        if storage.kind() != expected {
            return Err(ImportError::State {
                message: format!(
                    "job was stored with {expected} storage, got {}",
                    storage.kind()
                ),
            });
        }
        if self.chunk_size == 0 {
            return Err(ImportError::State {
                message: "chunk size must be greater than zero".to_string(),
            });
        }
        if options.chunk_size != self.chunk_size {
            tracing::debug!(
                saved = self.chunk_size,
                configured = options.chunk_size,
                "Using saved chunk size"
            );
        }

        let checkpoint = self.checkpoint();
        let result = self.result();
        let options = options.with_chunk_size(self.chunk_size);
        let parser = self
            .parser_state
            .into_parser()
            .map_err(|e| ImportError::State {
                message: e.to_string(),
            })?;
        Ok(ImportEngine::new(self.resource, parser, storage, options).with_progress(checkpoint, result))
    }
}

impl ImportEngine {
    /// Capture the engine's progress.
    pub fn state(&self) -> JobState {
        let checkpoint = self.checkpoint();
        let result = self.result();
        JobState {
            chunks_processed: checkpoint.chunks_processed,
            record_number: checkpoint.record_number,
            status: result.status(),
            error: result.error().map(str::to_string),
            resource: self.resource().clone(),
            parser_state: self.parser().snapshot(),
            chunk_size: self.options().chunk_size,
            storage: self.storage().kind().as_str().to_string(),
        }
    }

    /// Serialize the engine's progress as JSON.
    pub fn serialize(&self) -> Result<String> {
        self.state().to_json()
    }

    /// Rebuild an engine from [`serialize`](Self::serialize) output,
    /// reopening its storage at `storage_location`.
    pub fn restore(json: &str, storage_location: Option<&Path>) -> Result<Self> {
        JobState::from_json(json)?.open(storage_location, ImportOptions::default())
    }
}
