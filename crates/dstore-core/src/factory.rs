//! Adapter construction from kind tags.

use std::path::Path;

use dstore_ingest::{ParserKind, detect_mime_type};
use dstore_model::{Resource, Result};
use dstore_storage::{StorageAdapter, open_storage};

use crate::engine::ImportEngine;
use crate::options::ImportOptions;

/// Open a storage backend by tag. Unknown tags are reported as
/// [`ImportError::UnsupportedStorageAdapter`](dstore_model::ImportError::UnsupportedStorageAdapter).
pub fn build_storage(kind: &str, location: Option<&Path>) -> Result<Box<dyn StorageAdapter>> {
    Ok(open_storage(kind, location)?)
}

/// Parser kind for a resource, chosen from its detected MIME type.
pub fn parser_kind_for(resource: &Resource) -> ParserKind {
    ParserKind::for_mime_type(&detect_mime_type(resource))
}

/// Build an engine for a new import of `resource`.
pub fn create_engine(
    resource: Resource,
    storage_kind: &str,
    storage_location: Option<&Path>,
    options: ImportOptions,
) -> Result<ImportEngine> {
    let storage = build_storage(storage_kind, storage_location)?;
    let parser = parser_kind_for(&resource).build();
    tracing::debug!(
        resource = %resource.id(),
        parser = %parser.kind(),
        storage = %storage.kind(),
        "Created import engine"
    );
    Ok(ImportEngine::new(resource, parser, storage, options))
}
