//! Incremental CSV/TSV parsing.

mod parser;
mod state;

pub use parser::CsvParser;
pub use state::{CsvOptions, CsvParserState};
