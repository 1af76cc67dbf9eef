//! The resumable import engine.
//!
//! A run reads the resource in fixed-size chunks starting at the byte offset
//! implied by the checkpoint, feeds each chunk to the parser, turns the first
//! decoded row into the schema and stores every later row. Counters are
//! committed only after a chunk's rows have been stored, so a failed or
//! interrupted run leaves the checkpoint at the last fully stored chunk.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::time::Duration;

use tracing::{debug, info, warn};

use dstore_ingest::{ParserAdapter, detect_mime_type, is_text_mime_type};
use dstore_model::{Checkpoint, ImportError, ImportResult, ImportStatus, Record, Resource, Result};
use dstore_schema::SchemaSanitizer;
use dstore_storage::StorageAdapter;

use crate::clock::{Clock, SystemClock};
use crate::options::ImportOptions;

/// Drives one resource through a parser into a storage backend.
pub struct ImportEngine {
    resource: Resource,
    parser: Box<dyn ParserAdapter>,
    storage: Box<dyn StorageAdapter>,
    sanitizer: SchemaSanitizer,
    options: ImportOptions,
    checkpoint: Checkpoint,
    result: ImportResult,
    clock: Box<dyn Clock>,
}

impl ImportEngine {
    /// Create an engine for a fresh import.
    pub fn new(
        resource: Resource,
        parser: Box<dyn ParserAdapter>,
        storage: Box<dyn StorageAdapter>,
        options: ImportOptions,
    ) -> Self {
        Self {
            resource,
            parser,
            storage,
            sanitizer: SchemaSanitizer::default(),
            options,
            checkpoint: Checkpoint::default(),
            result: ImportResult::stopped(),
            clock: Box::new(SystemClock::new()),
        }
    }

    /// Continue from previously committed progress.
    #[must_use]
    pub fn with_progress(mut self, checkpoint: Checkpoint, result: ImportResult) -> Self {
        self.checkpoint = checkpoint;
        self.result = result;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: SchemaSanitizer) -> Self {
        self.sanitizer = sanitizer;
        self
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    pub fn result(&self) -> &ImportResult {
        &self.result
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    pub fn parser(&self) -> &dyn ParserAdapter {
        self.parser.as_ref()
    }

    pub fn storage(&self) -> &dyn StorageAdapter {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn StorageAdapter {
        self.storage.as_mut()
    }

    /// Import for at most `budget` of wall-clock time.
    ///
    /// Returns `DONE` once the whole file has been stored, `STOPPED` when the
    /// budget ran out first, and `ERROR` on any failure. A finished import
    /// (`DONE` or `ERROR`) is left untouched and its result returned again.
    pub fn run(&mut self, budget: Duration) -> ImportResult {
        if self.result.is_terminal() {
            debug!(
                resource = %self.resource.id(),
                status = %self.result.status(),
                "Import already finished"
            );
            return self.result.clone();
        }

        info!(
            resource = %self.resource.id(),
            chunks = self.checkpoint.chunks_processed,
            records = self.checkpoint.record_number,
            "Starting import pass"
        );
        self.result = match self.run_pass(budget) {
            Ok(status) => ImportResult::new(status, None),
            Err(err) if err.is_precondition() => {
                warn!(
                    resource = %self.resource.id(),
                    error = %err,
                    "Import rejected before reading"
                );
                ImportResult::failed(&err)
            }
            Err(err) => {
                warn!(
                    resource = %self.resource.id(),
                    chunks = self.checkpoint.chunks_processed,
                    error = %err,
                    "Import failed"
                );
                ImportResult::failed(&err)
            }
        };
        info!(
            resource = %self.resource.id(),
            status = %self.result.status(),
            chunks = self.checkpoint.chunks_processed,
            records = self.checkpoint.record_number,
            "Finished import pass"
        );
        self.result.clone()
    }

    /// Remove everything this import stored and start over.
    pub fn drop_data(&mut self) -> Result<()> {
        self.storage.destroy()?;
        self.parser.reset();
        self.checkpoint = Checkpoint::default();
        self.result = ImportResult::stopped();
        info!(resource = %self.resource.id(), "Dropped imported data");
        Ok(())
    }

    /// Make a failed import runnable again from its last committed chunk.
    ///
    /// Returns false when the import was not in the `ERROR` state.
    pub fn retry(&mut self) -> bool {
        if self.result.status() != ImportStatus::Error {
            return false;
        }
        info!(
            resource = %self.resource.id(),
            chunks = self.checkpoint.chunks_processed,
            "Retrying failed import"
        );
        self.result = ImportResult::stopped();
        true
    }

    fn run_pass(&mut self, budget: Duration) -> Result<ImportStatus> {
        // An empty buffer reads as end of input.
        if self.options.chunk_size == 0 {
            return Err(ImportError::InvalidOptions {
                message: "chunk size must be greater than zero".to_string(),
            });
        }

        let path = self.resource.file_path().to_path_buf();
        let file_size = fs::metadata(&path)
            .map_err(|source| ImportError::FileUnavailable {
                path: path.clone(),
                source,
            })?
            .len();

        let mime_type = detect_mime_type(&self.resource);
        if !is_text_mime_type(&mime_type) {
            return Err(ImportError::InvalidMimeType { path, mime_type });
        }

        let chunk_size = self.options.chunk_size;
        let offset = self.checkpoint.bytes_processed(chunk_size, file_size);
        let mut file = File::open(&path).map_err(|source| ImportError::FileUnavailable {
            path: path.clone(),
            source,
        })?;
        file.seek(SeekFrom::Start(offset))
            .map_err(|source| ImportError::Io {
                path: path.clone(),
                source,
            })?;

        let start = self.clock.now();
        let mut buffer = vec![0; chunk_size];
        while self.clock.now().saturating_sub(start) < budget {
            let read = read_chunk(&mut file, &mut buffer).map_err(|source| ImportError::Io {
                path: path.clone(),
                source,
            })?;
            if read == 0 {
                self.finish()?;
                return Ok(ImportStatus::Done);
            }
            self.process_chunk(&buffer[..read])?;
        }
        Ok(ImportStatus::Stopped)
    }

    /// Feed one chunk and store its rows; the parser is rolled back on failure.
    fn process_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        let chunk_number = self.checkpoint.chunks_processed + 1;
        let snapshot = self.parser.snapshot();

        let outcome = self
            .parser
            .feed(chunk)
            .map_err(|e| e.into_import_error(chunk_number))
            .and_then(|()| self.store_ready(chunk_number));
        match outcome {
            Ok(record_number) => {
                self.checkpoint = Checkpoint::new(chunk_number, record_number);
                debug!(
                    chunk = chunk_number,
                    bytes = chunk.len(),
                    records = record_number,
                    "Committed chunk"
                );
                Ok(())
            }
            Err(err) => {
                self.rollback(snapshot);
                Err(err)
            }
        }
    }

    /// Flush the row still buffered in the parser at end of input.
    fn finish(&mut self) -> Result<()> {
        let chunk_number = self.checkpoint.chunks_processed;
        let snapshot = self.parser.snapshot();

        let outcome = self
            .parser
            .finish()
            .map_err(|e| e.into_import_error(chunk_number))
            .and_then(|()| self.store_ready(chunk_number));
        match outcome {
            Ok(record_number) => {
                self.checkpoint.record_number = record_number;
                Ok(())
            }
            Err(err) => {
                self.rollback(snapshot);
                Err(err)
            }
        }
    }

    /// Drain ready rows: the first row of the file becomes the schema, the
    /// rest are stored in one batch. Returns the next record number.
    fn store_ready(&mut self, chunk_number: u64) -> Result<u64> {
        let rows: Vec<Vec<String>> = self.parser.records().collect();
        let mut record_number = self.checkpoint.record_number;
        let mut staged = Vec::with_capacity(rows.len());

        for values in rows {
            if record_number == 0 {
                let schema = self.sanitizer.sanitize(&values)?;
                debug!(fields = schema.len(), "Derived schema from header row");
                self.storage.set_schema(schema)?;
            } else {
                let record = Record::new(record_number, values)
                    .serialize()
                    .map_err(|e| ImportError::Storage {
                        message: format!("failed to encode record {record_number}: {e}"),
                    })?;
                staged.push(record);
            }
            record_number += 1;
        }

        if !staged.is_empty() {
            self.storage.store_multiple(&staged)?;
            debug!(
                chunk = chunk_number,
                stored = staged.len(),
                "Stored records"
            );
        }
        Ok(record_number)
    }

    fn rollback(&mut self, snapshot: dstore_ingest::ParserState) {
        if let Err(err) = self.parser.restore(snapshot) {
            warn!(error = %err, "Failed to roll back parser state");
        }
    }
}

/// Fill `buffer` from `reader`, stopping early only at end of input.
fn read_chunk(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl std::fmt::Debug for ImportEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportEngine")
            .field("resource", &self.resource)
            .field("parser", &self.parser.kind())
            .field("storage", &self.storage.kind())
            .field("options", &self.options)
            .field("checkpoint", &self.checkpoint)
            .field("result", &self.result)
            .finish_non_exhaustive()
    }
}
