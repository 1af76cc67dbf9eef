use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// The file targeted by an import.
///
/// Created once by the caller and never mutated; the engine only borrows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    id: String,
    file_path: PathBuf,
    #[serde(default)]
    mime_type: String,
}

impl Resource {
    pub fn new(
        id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file_path: file_path.into(),
            mime_type: mime_type.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Declared MIME type. Empty when the caller did not declare one.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}
