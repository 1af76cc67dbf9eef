//! Append-only record log on disk.
//!
//! A log storage directory holds two files:
//!
//! - `schema.json`: the committed schema, replaced atomically.
//! - `records.jsonl`: one JSON entry per line, either a `put` of a record
//!   payload or a `remove`. The current contents are rebuilt by replaying the
//!   log on open; [`LogStorage::compact`] rewrites it with one `put` per live
//!   record.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use dstore_model::{Schema, SerializedRecord};
use dstore_schema::SchemaSanitizer;

use crate::adapter::{RecordId, StorageAdapter, StorageKind, check_schema_conflict};
use crate::atomic::write_atomic;
use crate::error::{Result, StorageError};

pub const SCHEMA_FILE: &str = "schema.json";
pub const RECORDS_FILE: &str = "records.jsonl";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum LogEntry {
    Put { number: RecordId, payload: String },
    Remove { number: RecordId },
}

/// Directory-backed storage that survives process restarts.
#[derive(Debug)]
pub struct LogStorage {
    dir: PathBuf,
    sanitizer: SchemaSanitizer,
    schema: Option<Schema>,
    records: BTreeMap<RecordId, String>,
    /// Entries in the log file, live or not.
    entries: usize,
}

impl LogStorage {
    /// Open (or create) a log storage directory and replay its contents.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io("create directory", &dir, e))?;

        let mut storage = Self {
            dir,
            sanitizer: SchemaSanitizer::default(),
            schema: None,
            records: BTreeMap::new(),
            entries: 0,
        };
        storage.schema = storage.load_schema()?;
        storage.replay()?;

        tracing::debug!(
            dir = %storage.dir.display(),
            records = storage.records.len(),
            entries = storage.entries,
            "Opened log storage"
        );
        Ok(storage)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of entries in the log file, including superseded ones.
    pub fn log_entries(&self) -> usize {
        self.entries
    }

    /// Rewrite the log so it holds exactly one entry per live record.
    pub fn compact(&mut self) -> Result<()> {
        let mut buffer = Vec::new();
        for (&number, payload) in &self.records {
            write_entry(
                &mut buffer,
                &LogEntry::Put {
                    number,
                    payload: payload.clone(),
                },
            )?;
        }
        write_atomic(&self.records_path(), &buffer)?;

        tracing::info!(
            dir = %self.dir.display(),
            before = self.entries,
            after = self.records.len(),
            "Compacted record log"
        );
        self.entries = self.records.len();
        Ok(())
    }

    fn schema_path(&self) -> PathBuf {
        self.dir.join(SCHEMA_FILE)
    }

    fn records_path(&self) -> PathBuf {
        self.dir.join(RECORDS_FILE)
    }

    fn load_schema(&self) -> Result<Option<Schema>> {
        let path = self.schema_path();
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io("read", &path, e)),
        }
    }

    fn replay(&mut self) -> Result<()> {
        let path = self.records_path();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StorageError::io("read", &path, e)),
        };

        let complete = content.ends_with('\n');
        let lines: Vec<&str> = content.lines().collect();
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let entry = match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => entry,
                // A torn final write leaves an unterminated last line.
                Err(e) if !complete && index + 1 == lines.len() => {
                    tracing::warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Ignoring incomplete trailing log entry"
                    );
                    continue;
                }
                Err(e) => {
                    return Err(StorageError::CorruptLog {
                        path,
                        line: index + 1,
                        message: e.to_string(),
                    });
                }
            };
            self.apply(entry);
            self.entries += 1;
        }

        if !complete && !content.is_empty() {
            // Cut the torn tail so later appends start on a fresh line.
            let keep = content.rfind('\n').map_or(0, |pos| pos + 1);
            let file = OpenOptions::new()
                .write(true)
                .open(&path)
                .map_err(|e| StorageError::io("open", &path, e))?;
            file.set_len(keep as u64)
                .map_err(|e| StorageError::io("truncate", &path, e))?;
        }
        Ok(())
    }

    fn apply(&mut self, entry: LogEntry) {
        match entry {
            LogEntry::Put { number, payload } => {
                self.records.insert(number, payload);
            }
            LogEntry::Remove { number } => {
                self.records.remove(&number);
            }
        }
    }

    fn append(&mut self, entries: &[LogEntry]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let path = self.records_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| StorageError::io("open", &path, e))?;
        let mut writer = BufWriter::new(file);
        for entry in entries {
            write_entry(&mut writer, entry)?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| StorageError::io("write", &path, e.into_error()))?;
        file.sync_all()
            .map_err(|e| StorageError::io("sync", &path, e))?;
        self.entries += entries.len();
        Ok(())
    }
}

fn write_entry<W: Write>(writer: &mut W, entry: &LogEntry) -> Result<()> {
    serde_json::to_writer(&mut *writer, entry)?;
    writer
        .write_all(b"\n")
        .map_err(|e| StorageError::io("write", RECORDS_FILE, e))
}

impl StorageAdapter for LogStorage {
    fn kind(&self) -> StorageKind {
        StorageKind::Log
    }

    fn set_schema(&mut self, schema: Schema) -> Result<()> {
        let cleaned = self.sanitizer.clean_schema(&schema);
        check_schema_conflict(self.schema.as_ref(), &cleaned)?;
        if self.schema.is_none() {
            let bytes = serde_json::to_vec_pretty(&cleaned)?;
            write_atomic(&self.schema_path(), &bytes)?;
            tracing::info!(
                dir = %self.dir.display(),
                fields = cleaned.len(),
                "Committed schema"
            );
        }
        self.schema = Some(cleaned);
        Ok(())
    }

    fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    fn store_multiple(&mut self, records: &[SerializedRecord]) -> Result<Vec<RecordId>> {
        let entries: Vec<LogEntry> = records
            .iter()
            .map(|record| LogEntry::Put {
                number: record.number,
                payload: record.payload.clone(),
            })
            .collect();
        self.append(&entries)?;

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            self.records.insert(record.number, record.payload.clone());
            ids.push(record.number);
        }
        Ok(ids)
    }

    fn retrieve(&self, id: RecordId) -> Result<Option<String>> {
        Ok(self.records.get(&id).cloned())
    }

    fn retrieve_all(&self) -> Result<BTreeMap<RecordId, String>> {
        Ok(self.records.clone())
    }

    fn remove(&mut self, id: RecordId) -> Result<bool> {
        if !self.records.contains_key(&id) {
            return Ok(false);
        }
        self.append(&[LogEntry::Remove { number: id }])?;
        self.records.remove(&id);
        Ok(true)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.records.len())
    }

    fn destroy(&mut self) -> Result<()> {
        for path in [self.records_path(), self.schema_path()] {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(StorageError::io("remove", &path, e)),
            }
        }
        self.records.clear();
        self.schema = None;
        self.entries = 0;
        tracing::info!(dir = %self.dir.display(), "Destroyed log storage");
        Ok(())
    }
}
