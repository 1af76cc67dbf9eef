//! Data model for resumable datastore imports.
//!
//! These are the value types shared by every crate in the workspace:
//!
//! - [`Resource`]: the file being imported (id, path, declared MIME type)
//! - [`Checkpoint`]: persisted progress counters
//! - [`ImportResult`]: status (`STOPPED`, `DONE`, `ERROR`) and error detail
//! - [`Schema`]: sanitized field names derived from the header row
//! - [`Record`]: one decoded data row and its serialized form
//! - [`ImportError`]: the error taxonomy surfaced through results

pub mod checkpoint;
pub mod error;
pub mod record;
pub mod resource;
pub mod schema;

pub use checkpoint::{Checkpoint, ImportResult, ImportStatus};
pub use error::{ImportError, Result};
pub use record::{Record, SerializedRecord};
pub use resource::Resource;
pub use schema::{Field, FieldType, Schema};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_starts_stopped_without_error() {
        let result = ImportResult::default();
        assert_eq!(result.status(), ImportStatus::Stopped);
        assert!(result.error().is_none());
        assert!(!result.is_terminal());
    }

    #[test]
    fn failed_result_carries_error_message() {
        let err = ImportError::DuplicateHeader {
            duplicates: vec!["id".to_string()],
        };
        let result = ImportResult::failed(&err);
        assert_eq!(result.status(), ImportStatus::Error);
        assert_eq!(result.error(), Some("duplicate header(s): id"));
        assert!(result.is_terminal());
    }
}
