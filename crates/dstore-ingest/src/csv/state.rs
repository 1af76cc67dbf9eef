//! Parser options and the serializable snapshot of a [`CsvParser`].
//!
//! [`CsvParser`]: super::CsvParser

use serde::{Deserialize, Serialize};

/// Dialect settings for delimited text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Field delimiter. Defaults to `,`.
    pub delimiter: u8,
    /// Quote character. Defaults to `"`.
    pub quote: u8,
    /// Accept rows whose field count differs from the first row.
    /// Defaults to true.
    pub flexible: bool,
    /// Trim surrounding whitespace from every value.
    /// Defaults to false.
    pub trim: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            flexible: true,
            trim: false,
        }
    }
}

impl CsvOptions {
    /// Tab separated values.
    pub fn tsv() -> Self {
        Self {
            delimiter: b'\t',
            ..Self::default()
        }
    }

    /// Set the field delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Enable or disable ragged rows.
    #[must_use]
    pub fn with_flexible(mut self, flexible: bool) -> Self {
        self.flexible = flexible;
        self
    }

    /// Enable or disable value trimming.
    #[must_use]
    pub fn with_trim(mut self, trim: bool) -> Self {
        self.trim = trim;
        self
    }

    pub(crate) fn build_core(&self) -> csv_core::Reader {
        csv_core::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .build()
    }
}

/// Everything a [`CsvParser`](super::CsvParser) needs to continue after a
/// process restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvParserState {
    pub options: CsvOptions,
    /// Raw bytes of the row being assembled, hex encoded on disk.
    #[serde(with = "hex_bytes")]
    pub pending: Vec<u8>,
    /// Decoded rows not yet taken by the caller.
    #[serde(default)]
    pub ready: Vec<Vec<String>>,
    pub records_emitted: u64,
    #[serde(default)]
    pub expected_fields: Option<usize>,
    #[serde(default)]
    pub finished: bool,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map_err(serde::de::Error::custom)
    }
}
