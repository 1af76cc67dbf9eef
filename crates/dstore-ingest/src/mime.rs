//! MIME type detection for import resources.

use dstore_model::Resource;

/// Fallback when nothing better is known.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Detect the MIME type of a resource.
///
/// A declared type wins. Otherwise the file extension decides, and unknown
/// extensions are treated as binary.
pub fn detect_mime_type(resource: &Resource) -> String {
    let declared = resource.mime_type().trim();
    if !declared.is_empty() {
        return declared.to_ascii_lowercase();
    }
    let extension = resource
        .file_path()
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    let guessed = match extension.as_deref() {
        Some("csv") => "text/csv",
        Some("tsv" | "tab") => "text/tab-separated-values",
        Some("txt") => "text/plain",
        _ => OCTET_STREAM,
    };
    guessed.to_string()
}

/// Only `text/*` resources can be imported.
pub fn is_text_mime_type(mime_type: &str) -> bool {
    mime_type.trim().to_ascii_lowercase().starts_with("text")
}
