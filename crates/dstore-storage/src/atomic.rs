//! Crash-safe file replacement.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// Replace `path` with `bytes`.
///
/// The content is written to a sibling temp file, synced, then renamed over
/// the target, so readers see either the old or the new file in full.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| StorageError::io("create directory", parent, e))?;
    }

    let temp_path = temp_path_for(path);
    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::io("create", &temp_path, e))?;
    file.write_all(bytes)
        .map_err(|e| StorageError::io("write", &temp_path, e))?;
    file.sync_all()
        .map_err(|e| StorageError::io("sync", &temp_path, e))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::io("rename", path, e))?;
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }
}
