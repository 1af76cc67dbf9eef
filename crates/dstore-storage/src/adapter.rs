//! The storage contract used by the import engine.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use dstore_model::{Schema, SerializedRecord};

use crate::error::{Result, StorageError};
use crate::log::LogStorage;
use crate::memory::MemoryStorage;

/// Identifier assigned to a stored record.
pub type RecordId = u64;

/// Bulk writer and reader of imported records.
///
/// Storing the same record twice must leave a single copy: the engine
/// re-stores a chunk's records when a run is retried.
pub trait StorageAdapter: Send {
    /// Kind tag for this backend.
    fn kind(&self) -> StorageKind;

    /// Commit the schema derived from the header row.
    fn set_schema(&mut self, schema: Schema) -> Result<()>;

    fn schema(&self) -> Option<&Schema>;

    /// Write a batch of records; returns the ids they were stored under.
    fn store_multiple(&mut self, records: &[SerializedRecord]) -> Result<Vec<RecordId>>;

    fn retrieve(&self, id: RecordId) -> Result<Option<String>>;

    /// All records ordered by id.
    fn retrieve_all(&self) -> Result<BTreeMap<RecordId, String>>;

    /// Remove one record. Returns false if it did not exist.
    fn remove(&mut self, id: RecordId) -> Result<bool>;

    fn count(&self) -> Result<usize>;

    /// Remove every record and the schema.
    fn destroy(&mut self) -> Result<()>;
}

/// Closed set of known storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageKind {
    /// Process-local map; lost on exit.
    Memory,
    /// Append-only record log in a directory.
    Log,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKind::Memory => "memory",
            StorageKind::Log => "log",
        }
    }

    /// True when stored records outlive the process.
    pub fn is_durable(&self) -> bool {
        matches!(self, StorageKind::Log)
    }

    /// Open a backend of this kind. `location` is required for on-disk kinds.
    pub fn open(&self, location: Option<&Path>) -> Result<Box<dyn StorageAdapter>> {
        match self {
            StorageKind::Memory => Ok(Box::new(MemoryStorage::new())),
            StorageKind::Log => {
                let dir = location.ok_or(StorageError::MissingLocation { kind: "log" })?;
                Ok(Box::new(LogStorage::open(dir)?))
            }
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "log" => Ok(StorageKind::Log),
            other => Err(StorageError::UnknownKind(other.to_string())),
        }
    }
}

/// Resolve a kind tag and open the backend.
pub fn open_storage(kind: &str, location: Option<&Path>) -> Result<Box<dyn StorageAdapter>> {
    kind.parse::<StorageKind>()?.open(location)
}

/// Reject a schema that differs from the one already committed.
pub(crate) fn check_schema_conflict(existing: Option<&Schema>, incoming: &Schema) -> Result<()> {
    match existing {
        Some(existing) if existing != incoming => Err(StorageError::SchemaConflict {
            existing: existing.names().join(", "),
            incoming: incoming.names().join(", "),
        }),
        _ => Ok(()),
    }
}
