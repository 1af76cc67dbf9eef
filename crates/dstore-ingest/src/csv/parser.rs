//! Chunk-fed CSV decoding on top of `csv-core`.

use std::collections::VecDeque;

use crate::adapter::{ParserAdapter, ParserKind, ParserState};
use crate::csv::state::{CsvOptions, CsvParserState};
use crate::error::{ParserError, Result};

const INITIAL_OUTPUT_CAPACITY: usize = 1024;
const INITIAL_ENDS_CAPACITY: usize = 32;

/// Incremental CSV parser.
///
/// Rows become available as soon as their terminator has been fed. The raw
/// bytes of the row currently being assembled are retained so the parser can
/// be snapshotted between chunks and rebuilt from scratch later.
pub struct CsvParser {
    kind: ParserKind,
    options: CsvOptions,
    core: csv_core::Reader,
    output: Vec<u8>,
    output_len: usize,
    ends: Vec<usize>,
    ends_len: usize,
    pending: Vec<u8>,
    ready: VecDeque<Vec<String>>,
    records_emitted: u64,
    expected_fields: Option<usize>,
    finished: bool,
}

impl CsvParser {
    pub fn new(options: CsvOptions) -> Self {
        Self::with_kind(ParserKind::Csv, options)
    }

    pub(crate) fn with_kind(kind: ParserKind, options: CsvOptions) -> Self {
        let core = options.build_core();
        Self {
            kind,
            options,
            core,
            output: vec![0; INITIAL_OUTPUT_CAPACITY],
            output_len: 0,
            ends: vec![0; INITIAL_ENDS_CAPACITY],
            ends_len: 0,
            pending: Vec::new(),
            ready: VecDeque::new(),
            records_emitted: 0,
            expected_fields: None,
            finished: false,
        }
    }

    /// Rebuild a parser by replaying the buffered partial row.
    ///
    /// The saved buffer never holds a complete row, so replaying it must only
    /// rebuild the decoder state. Anything else means the state is corrupt.
    pub(crate) fn from_state(kind: ParserKind, state: CsvParserState) -> Result<Self> {
        let mut parser = Self::with_kind(kind, state.options);
        parser.records_emitted = state.records_emitted;
        parser.expected_fields = state.expected_fields;
        parser.finished = state.finished;
        parser.ready = state.ready.into();

        let emitted = parser.records_emitted;
        parser
            .consume(&state.pending, false)
            .map_err(|err| ParserError::CorruptState {
                message: err.to_string(),
            })?;
        if parser.records_emitted != emitted {
            return Err(ParserError::CorruptState {
                message: "buffered bytes contain a complete row".to_string(),
            });
        }
        Ok(parser)
    }

    /// Run `input` through the decoder. With `eof` set, an empty input marks
    /// the end of the stream and flushes any partial row.
    fn consume(&mut self, mut input: &[u8], eof: bool) -> Result<()> {
        loop {
            if input.is_empty() && !eof {
                return Ok(());
            }
            let (result, nin, nout, nend) = self.core.read_record(
                input,
                &mut self.output[self.output_len..],
                &mut self.ends[self.ends_len..],
            );
            self.pending.extend_from_slice(&input[..nin]);
            input = &input[nin..];
            self.output_len += nout;
            self.ends_len += nend;

            match result {
                csv_core::ReadRecordResult::InputEmpty => return Ok(()),
                csv_core::ReadRecordResult::OutputFull => {
                    let len = self.output.len();
                    self.output.resize(len * 2, 0);
                }
                csv_core::ReadRecordResult::OutputEndsFull => {
                    let len = self.ends.len();
                    self.ends.resize(len * 2, 0);
                }
                csv_core::ReadRecordResult::Record => self.emit_record()?,
                csv_core::ReadRecordResult::End => return Ok(()),
            }
        }
    }

    fn emit_record(&mut self) -> Result<()> {
        let record = self.records_emitted;
        let mut start = 0;
        let decoded: std::result::Result<Vec<String>, _> = self.ends[..self.ends_len]
            .iter()
            .map(|&end| {
                let bytes = self.output[start..end].to_vec();
                start = end;
                String::from_utf8(bytes)
            })
            .collect();
        self.output_len = 0;
        self.ends_len = 0;
        self.pending.clear();
        let mut fields = decoded.map_err(|source| ParserError::InvalidUtf8 { record, source })?;

        if record == 0
            && let Some(first) = fields.first_mut()
            && first.starts_with('\u{feff}')
        {
            first.remove(0);
        }
        if self.options.trim {
            for value in &mut fields {
                let trimmed = value.trim();
                if trimmed.len() != value.len() {
                    *value = trimmed.to_string();
                }
            }
        }

        match self.expected_fields {
            None => self.expected_fields = Some(fields.len()),
            Some(expected) if !self.options.flexible && expected != fields.len() => {
                return Err(ParserError::UnequalLengths {
                    record,
                    expected,
                    found: fields.len(),
                });
            }
            Some(_) => {}
        }

        self.records_emitted += 1;
        self.ready.push_back(fields);
        Ok(())
    }
}

impl ParserAdapter for CsvParser {
    fn kind(&self) -> ParserKind {
        self.kind
    }

    fn feed(&mut self, chunk: &[u8]) -> Result<()> {
        if self.finished {
            return Err(ParserError::Finished);
        }
        if chunk.is_empty() {
            return Ok(());
        }
        self.consume(chunk, false)
    }

    fn next_record(&mut self) -> Option<Vec<String>> {
        self.ready.pop_front()
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.consume(&[], true)
    }

    fn snapshot(&self) -> ParserState {
        let state = CsvParserState {
            options: self.options.clone(),
            pending: self.pending.clone(),
            ready: self.ready.iter().cloned().collect(),
            records_emitted: self.records_emitted,
            expected_fields: self.expected_fields,
            finished: self.finished,
        };
        match self.kind {
            ParserKind::Csv => ParserState::Csv(state),
            ParserKind::Tsv => ParserState::Tsv(state),
        }
    }

    fn restore(&mut self, state: ParserState) -> Result<()> {
        if state.kind() != self.kind {
            return Err(ParserError::StateMismatch {
                expected: self.kind,
                found: state.kind(),
            });
        }
        let (ParserState::Csv(inner) | ParserState::Tsv(inner)) = state;
        *self = Self::from_state(self.kind, inner)?;
        Ok(())
    }

    fn reset(&mut self) {
        *self = Self::with_kind(self.kind, self.options.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(parser: &mut CsvParser) -> Vec<Vec<String>> {
        std::iter::from_fn(|| parser.next_record()).collect()
    }

    #[test]
    fn parses_complete_rows() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(b"a,b,c\n1,2,3\n").unwrap();
        assert_eq!(drain(&mut parser), vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn holds_partial_row_until_terminator() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(b"a,b\n1,").unwrap();
        assert_eq!(drain(&mut parser), vec![vec!["a", "b"]]);
        assert_eq!(parser.pending.len(), 2);
        parser.feed(b"2\n").unwrap();
        assert_eq!(drain(&mut parser), vec![vec!["1", "2"]]);
        assert_eq!(parser.pending.len(), 0);
    }

    #[test]
    fn finish_flushes_unterminated_row() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(b"a,b\n1,2").unwrap();
        assert_eq!(drain(&mut parser).len(), 1);
        parser.finish().unwrap();
        assert_eq!(drain(&mut parser), vec![vec!["1", "2"]]);
        assert!(matches!(parser.feed(b"x"), Err(ParserError::Finished)));
    }

    #[test]
    fn quoted_field_split_across_chunks() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(b"name,note\nx,\"hello, ").unwrap();
        parser.feed(b"\"\"world\"\"\nsecond\"\n").unwrap();
        let rows = drain(&mut parser);
        assert_eq!(rows[1], vec!["x", "hello, \"world\"\nsecond"]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let bytes = "id,city\n1,Zürich\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xC3).unwrap() + 1;
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(&bytes[..split]).unwrap();
        parser.feed(&bytes[split..]).unwrap();
        assert_eq!(drain(&mut parser)[1], vec!["1", "Zürich"]);
    }

    #[test]
    fn strips_byte_order_mark_from_first_field() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed("\u{feff}id,name\n".as_bytes()).unwrap();
        assert_eq!(drain(&mut parser), vec![vec!["id", "name"]]);
    }

    #[test]
    fn invalid_utf8_is_an_error() {
        let mut parser = CsvParser::new(CsvOptions::default());
        let err = parser.feed(b"a,\xff\xfe\n").unwrap_err();
        assert!(matches!(err, ParserError::InvalidUtf8 { record: 0, .. }));
    }

    #[test]
    fn strict_mode_rejects_ragged_rows() {
        let options = CsvOptions::default().with_flexible(false);
        let mut parser = CsvParser::new(options);
        let err = parser.feed(b"a,b\n1,2,3\n").unwrap_err();
        assert!(matches!(
            err,
            ParserError::UnequalLengths {
                record: 1,
                expected: 2,
                found: 3
            }
        ));
    }

    #[test]
    fn flexible_mode_accepts_ragged_rows() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(b"a,b\n1,2,3\n4\n").unwrap();
        assert_eq!(drain(&mut parser).len(), 3);
    }

    #[test]
    fn snapshot_and_restore_resume_mid_row() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(b"a,b\n\"quoted, ").unwrap();
        let state = parser.snapshot();

        let mut resumed = CsvParser::new(CsvOptions::default());
        resumed.restore(state).unwrap();
        resumed.feed(b"value\",2\n").unwrap();
        assert_eq!(
            drain(&mut resumed),
            vec![vec!["a", "b"], vec!["quoted, value", "2"]]
        );
        assert_eq!(resumed.records_emitted, 2);
    }

    #[test]
    fn restore_rejects_other_kind() {
        let tsv = CsvParser::with_kind(ParserKind::Tsv, CsvOptions::tsv()).snapshot();
        let mut csv = CsvParser::new(CsvOptions::default());
        assert!(matches!(
            csv.restore(tsv),
            Err(ParserError::StateMismatch { .. })
        ));
    }

    #[test]
    fn restore_rejects_buffer_with_complete_row() {
        let mut parser = CsvParser::new(CsvOptions::default());
        parser.feed(b"a,b\n1,").unwrap();
        let ParserState::Csv(mut state) = parser.snapshot() else {
            unreachable!()
        };
        state.pending = b"1,2\n".to_vec();

        let mut resumed = CsvParser::new(CsvOptions::default());
        let err = resumed.restore(ParserState::Csv(state.clone())).unwrap_err();
        assert!(matches!(err, ParserError::CorruptState { .. }));
        assert!(matches!(
            ParserState::Csv(state).into_parser(),
            Err(ParserError::CorruptState { .. })
        ));
    }

    #[test]
    fn reset_keeps_options() {
        let mut parser = CsvParser::new(CsvOptions::default().with_trim(true));
        parser.feed(b"a,b\n1,").unwrap();
        parser.finish().unwrap();
        parser.reset();
        assert_eq!(parser.records_emitted, 0);
        assert_eq!(parser.pending.len(), 0);
        parser.feed(b" x ,y\n").unwrap();
        assert_eq!(drain(&mut parser), vec![vec!["x", "y"]]);
    }

    #[test]
    fn trims_whitespace_when_enabled() {
        let mut parser = CsvParser::new(CsvOptions::default().with_trim(true));
        parser.feed(b" a , b \n").unwrap();
        assert_eq!(drain(&mut parser), vec![vec!["a", "b"]]);
    }
}
