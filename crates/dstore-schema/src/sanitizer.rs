//! Header row to schema conversion.

use std::collections::{BTreeMap, BTreeSet};

use sha2::{Digest, Sha256};

use dstore_model::{Field, ImportError, Schema};

use crate::reserved::is_reserved_word;

/// Maximum column name length in the target database (MySQL).
pub const MAX_FIELD_LENGTH: usize = 64;

/// Length of the hash token appended to truncated names.
pub const TOKEN_LENGTH: usize = 4;

/// Smallest usable limit: room for one character, `_`, and a token.
const MIN_FIELD_LENGTH: usize = TOKEN_LENGTH + 2;

/// Turns raw header text into storage-safe field names.
///
/// Stateless: the same header row always produces the same schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaSanitizer {
    max_length: usize,
}

impl Default for SchemaSanitizer {
    fn default() -> Self {
        Self {
            max_length: MAX_FIELD_LENGTH,
        }
    }
}

impl SchemaSanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different identifier length limit.
    #[must_use]
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length.max(MIN_FIELD_LENGTH);
        self
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Build a schema from the first row of a file.
    ///
    /// Byte-identical raw headers are ambiguous and rejected. Headers that
    /// only collide after sanitization get a numeric suffix.
    pub fn sanitize<S: AsRef<str>>(&self, raw_headers: &[S]) -> Result<Schema, ImportError> {
        let duplicates = duplicate_headers(raw_headers);
        if !duplicates.is_empty() {
            return Err(ImportError::DuplicateHeader { duplicates });
        }

        let mut taken = BTreeSet::new();
        let mut fields = Vec::with_capacity(raw_headers.len());
        for raw in raw_headers {
            let raw = raw.as_ref();
            let name = self.unique_name(self.sanitize_name(raw), &taken);
            taken.insert(name.clone());
            let field = if name == raw {
                Field::text(name)
            } else {
                Field::text(name).with_description(raw)
            };
            fields.push(field);
        }

        tracing::debug!(fields = fields.len(), "Derived schema from header row");
        Ok(Schema::new(fields))
    }

    /// Re-apply the naming rules to an existing schema.
    ///
    /// Names that already satisfy the rules are kept as they are, so cleaning
    /// a clean schema changes nothing. Existing descriptions are preserved.
    pub fn clean_schema(&self, schema: &Schema) -> Schema {
        let mut taken = BTreeSet::new();
        let mut fields = Vec::with_capacity(schema.len());
        for field in schema.fields() {
            let candidate = if self.is_valid_name(&field.name) {
                field.name.clone()
            } else {
                self.sanitize_name(&field.name)
            };
            let name = self.unique_name(candidate, &taken);
            taken.insert(name.clone());

            let description = match &field.description {
                Some(existing) => Some(existing.clone()),
                None if name != field.name => Some(field.name.clone()),
                None => None,
            };
            fields.push(Field {
                name,
                field_type: field.field_type,
                description,
            });
        }
        Schema::new(fields)
    }

    /// Sanitize one header without considering the rest of the row.
    pub fn sanitize_name(&self, raw: &str) -> String {
        let mut name = normalize_header(raw);
        if name.is_empty() || is_numeric(&name) || is_reserved_word(&name) {
            name.insert(0, '_');
        }
        self.truncate_name(name)
    }

    /// True if `name` could have been produced by this sanitizer.
    pub fn is_valid_name(&self, name: &str) -> bool {
        !name.is_empty()
            && name.len() <= self.max_length
            && name
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
            && !is_numeric(name)
            && !is_reserved_word(name)
    }

    fn truncate_name(&self, name: String) -> String {
        if name.len() <= self.max_length {
            return name;
        }
        // Names are ASCII at this point, so byte slicing is safe.
        let prefix = &name[..self.max_length - TOKEN_LENGTH - 1];
        format!("{prefix}_{}", generate_token(&name))
    }

    fn unique_name(&self, name: String, taken: &BTreeSet<String>) -> String {
        if !taken.contains(&name) {
            return name;
        }
        let mut counter = 2usize;
        loop {
            let suffix = format!("_{counter}");
            let keep = name.len().min(self.max_length - suffix.len());
            let candidate = format!("{}{suffix}", &name[..keep]);
            if !taken.contains(&candidate) && !is_reserved_word(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }
}

/// Replace spaces, strip unsupported characters, trim underscores, lowercase.
pub fn normalize_header(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|ch| if ch == ' ' { '_' } else { ch })
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
        .collect();
    replaced.trim_matches('_').to_ascii_lowercase()
}

/// Deterministic 4 character token derived from `seed`.
pub fn generate_token(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    let mut token = hex::encode(digest);
    token.truncate(TOKEN_LENGTH);
    token
}

/// Integer or exponent-form number (`123`, `1e5`). MySQL rejects both as
/// bare column names.
fn is_numeric(name: &str) -> bool {
    let mut parts = name.splitn(2, 'e');
    let mantissa = parts.next().unwrap_or_default();
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match parts.next() {
        None => all_digits(mantissa),
        Some(exponent) => all_digits(mantissa) && all_digits(exponent),
    }
}

fn duplicate_headers<S: AsRef<str>>(raw_headers: &[S]) -> Vec<String> {
    let headers: Vec<&str> = raw_headers.iter().map(|raw| raw.as_ref()).collect();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for raw in &headers {
        *counts.entry(*raw).or_default() += 1;
    }
    let mut reported = BTreeSet::new();
    headers
        .into_iter()
        .filter(|raw| counts[raw] > 1 && reported.insert(*raw))
        .map(str::to_string)
        .collect()
}
