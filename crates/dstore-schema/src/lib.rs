//! Schema derivation for datastore imports.
//!
//! The first row of every imported file is turned into a [`Schema`] by
//! [`SchemaSanitizer::sanitize`]. The resulting field names are:
//!
//! - unique within the schema (`name`, `name_2`, `name_3`, ...)
//! - at most [`MAX_FIELD_LENGTH`] characters, with a hash token on truncation
//! - never purely numeric and never a bare MySQL reserved word
//!
//! Storage adapters compose the same sanitizer to clean schemas handed to
//! them directly ([`SchemaSanitizer::clean_schema`]).
//!
//! [`Schema`]: dstore_model::Schema

mod reserved;
mod sanitizer;

pub use reserved::{RESERVED_WORDS, is_reserved_word};
pub use sanitizer::{
    MAX_FIELD_LENGTH, SchemaSanitizer, TOKEN_LENGTH, generate_token, normalize_header,
};
