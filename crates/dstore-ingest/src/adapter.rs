//! The parser contract used by the import engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::csv::{CsvOptions, CsvParser, CsvParserState};
use crate::error::{ParserError, Result};

/// Incremental decoder of raw bytes into rows.
///
/// Bytes arrive in arbitrary chunks; a row split across chunks is buffered
/// until its terminator (or `finish()`) arrives.
pub trait ParserAdapter: Send {
    /// Kind tag used to restore saved state.
    fn kind(&self) -> ParserKind;

    /// Consume the next chunk of input.
    fn feed(&mut self, chunk: &[u8]) -> Result<()>;

    /// Take the next complete row, if one is ready.
    fn next_record(&mut self) -> Option<Vec<String>>;

    /// Flush a buffered partial row as a final record.
    fn finish(&mut self) -> Result<()>;

    /// Capture everything needed to continue later with a fresh instance.
    fn snapshot(&self) -> ParserState;

    /// Replace the current state with a snapshot.
    fn restore(&mut self, state: ParserState) -> Result<()>;

    /// Discard all progress, keeping the configuration.
    fn reset(&mut self);
}

impl dyn ParserAdapter + '_ {
    /// Drain the rows that are ready since the last call.
    pub fn records(&mut self) -> Records<'_> {
        Records { parser: self }
    }
}

/// Lazy iterator over ready rows. Not restartable: rows are consumed.
pub struct Records<'a> {
    parser: &'a mut dyn ParserAdapter,
}

impl Iterator for Records<'_> {
    type Item = Vec<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.next_record()
    }
}

/// Closed set of known parsers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParserKind {
    /// Comma separated values.
    Csv,
    /// Tab separated values.
    Tsv,
}

impl ParserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserKind::Csv => "csv",
            ParserKind::Tsv => "tsv",
        }
    }

    /// Pick a parser for a detected MIME type. Anything that is not
    /// explicitly tab separated is read as CSV.
    pub fn for_mime_type(mime_type: &str) -> Self {
        let essence = mime_type.split(';').next().unwrap_or_default().trim();
        if essence.eq_ignore_ascii_case("text/tab-separated-values") {
            ParserKind::Tsv
        } else {
            ParserKind::Csv
        }
    }

    /// Construct a fresh parser of this kind.
    pub fn build(&self) -> Box<dyn ParserAdapter> {
        let options = match self {
            ParserKind::Csv => CsvOptions::default(),
            ParserKind::Tsv => CsvOptions::tsv(),
        };
        Box::new(CsvParser::with_kind(*self, options))
    }
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParserKind {
    type Err = ParserError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ParserKind::Csv),
            "tsv" => Ok(ParserKind::Tsv),
            other => Err(ParserError::UnknownKind(other.to_string())),
        }
    }
}

/// Saved parser state, tagged by parser kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParserState {
    Csv(CsvParserState),
    Tsv(CsvParserState),
}

impl ParserState {
    pub fn kind(&self) -> ParserKind {
        match self {
            ParserState::Csv(_) => ParserKind::Csv,
            ParserState::Tsv(_) => ParserKind::Tsv,
        }
    }

    /// Rebuild a parser from saved state.
    pub fn into_parser(self) -> Result<Box<dyn ParserAdapter>> {
        let parser = match self {
            ParserState::Csv(state) => CsvParser::from_state(ParserKind::Csv, state)?,
            ParserState::Tsv(state) => CsvParser::from_state(ParserKind::Tsv, state)?,
        };
        Ok(Box::new(parser))
    }
}
