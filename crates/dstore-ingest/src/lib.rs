//! Parser adapters for datastore imports.
//!
//! The import engine reads a file in fixed-size chunks and hands each chunk to
//! a [`ParserAdapter`]. Adapters decode rows incrementally, buffer partial
//! rows across chunk boundaries, and can be snapshotted to a serializable
//! [`ParserState`] between runs.
//!
//! # Example
//!
//! ```
//! use dstore_ingest::ParserKind;
//!
//! let mut parser = ParserKind::Csv.build();
//! parser.feed(b"country,population\nUS,3152").unwrap();
//! parser.feed(b"09000\n").unwrap();
//! let rows: Vec<Vec<String>> = parser.records().collect();
//! assert_eq!(rows[1], vec!["US", "315209000"]);
//! ```

mod adapter;
mod csv;
mod error;
mod mime;

// === Parser Contract ===
pub use adapter::{ParserAdapter, ParserKind, ParserState, Records};

// === CSV ===
pub use csv::{CsvOptions, CsvParser, CsvParserState};

// === Errors ===
pub use error::{ParserError, Result};

// === MIME Detection ===
pub use mime::{OCTET_STREAM, detect_mime_type, is_text_mime_type};
