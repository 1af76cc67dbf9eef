use serde::{Deserialize, Serialize};

/// One decoded data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Position of the row in the file; the header is row 0.
    pub number: u64,
    pub values: Vec<String>,
}

impl Record {
    pub fn new(number: u64, values: Vec<String>) -> Self {
        Self { number, values }
    }

    /// Encode the values as a JSON array of strings.
    pub fn serialize(&self) -> serde_json::Result<SerializedRecord> {
        Ok(SerializedRecord {
            number: self.number,
            payload: serde_json::to_string(&self.values)?,
        })
    }
}

/// A record in the form handed to storage.
///
/// `number` lets a backend turn a repeated store of the same row into an
/// overwrite rather than a second copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRecord {
    pub number: u64,
    pub payload: String,
}

impl SerializedRecord {
    /// Decode the payload back into field values.
    pub fn values(&self) -> serde_json::Result<Vec<String>> {
        serde_json::from_str(&self.payload)
    }
}
