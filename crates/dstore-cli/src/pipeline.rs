//! Command stages with typed results.
//!
//! 1. **Configure**: merge options from a TOML file and command line flags
//! 2. **Import**: open or resume a job and run passes until done or limited
//! 3. **Inspect**: read saved job state, preview a file's schema
//! 4. **Drop**: remove imported records and the saved state

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use dstore_core::{ImportOptions, JobRunner, JobState, RunSummary, parser_kind_for};
use dstore_ingest::{detect_mime_type, is_text_mime_type};
use dstore_model::{Resource, Schema};
use dstore_schema::SchemaSanitizer;
use dstore_storage::StorageKind;

/// Command line values that take precedence over the options file.
#[derive(Debug, Clone, Default)]
pub struct OptionOverrides {
    pub chunk_size: Option<usize>,
    pub time_budget: Option<Duration>,
    pub max_passes: Option<u32>,
}

/// Load options from `config` (or defaults) and apply `overrides`.
pub fn resolve_options(config: Option<&Path>, overrides: &OptionOverrides) -> Result<ImportOptions> {
    let mut options = match config {
        Some(path) => ImportOptions::load(path)?,
        None => ImportOptions::default(),
    };
    if let Some(chunk_size) = overrides.chunk_size {
        options = options.with_chunk_size(chunk_size);
    }
    if let Some(budget) = overrides.time_budget {
        options = options.with_time_budget(budget);
    }
    if let Some(max_passes) = overrides.max_passes {
        options = options.with_max_passes(max_passes);
    }
    options.validate()?;
    Ok(options)
}

/// Describe `file` as an import resource. The id defaults to the file name.
pub fn resource_for(file: &Path, id: Option<&str>, mime_type: Option<&str>) -> Resource {
    let id = id.map_or_else(
        || {
            file.file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string())
        },
        str::to_string,
    );
    Resource::new(id, file, mime_type.unwrap_or_default())
}

/// Inputs for [`import`].
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub resource: Resource,
    pub storage: StorageKind,
    pub state_path: PathBuf,
    pub storage_dir: PathBuf,
    pub options: ImportOptions,
    pub retry: bool,
}

/// What an import invocation achieved.
#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub resource: Resource,
    pub storage: StorageKind,
    pub summary: RunSummary,
    pub stored: usize,
}

/// Start or resume an import and run it.
pub fn import(request: ImportRequest) -> Result<ImportOutcome> {
    let runner = JobRunner::new(&request.state_path, request.options)
        .with_storage_dir(&request.storage_dir);
    let mut engine = runner
        .open(Some(request.resource), request.storage.as_str())
        .with_context(|| format!("open job {}", request.state_path.display()))?;
    if request.retry && engine.retry() {
        runner.save(&engine)?;
    }

    let summary = runner.run(&mut engine)?;
    Ok(ImportOutcome {
        resource: engine.resource().clone(),
        storage: engine.storage().kind(),
        stored: engine.storage().count()?,
        summary,
    })
}

/// Saved state at `state_path`, if an import was started there.
pub fn status(state_path: &Path) -> Result<Option<JobState>> {
    let runner = JobRunner::new(state_path, ImportOptions::default());
    Ok(runner.load_state()?)
}

/// Remove the records of the saved import and its state file.
///
/// Returns the number of records removed, or `None` if no import was saved.
pub fn drop_import(state_path: &Path, storage_dir: &Path) -> Result<Option<usize>> {
    let runner = JobRunner::new(state_path, ImportOptions::default()).with_storage_dir(storage_dir);
    let Some(state) = runner.load_state()? else {
        return Ok(None);
    };
    let id = state.resource.id().to_string();
    let removed = if state.storage_kind()?.is_durable() {
        let mut engine = state.open(Some(storage_dir), ImportOptions::default())?;
        let removed = engine.storage().count()?;
        engine.drop_data()?;
        removed
    } else {
        // Records held in memory ended with the process that stored them.
        0
    };
    runner.remove_state()?;
    info!("Dropped {removed} records of '{id}'");
    Ok(Some(removed))
}

/// Sanitized schema for the first row of `resource`, without importing.
pub fn preview_schema(resource: &Resource) -> Result<Schema> {
    let mime_type = detect_mime_type(resource);
    if !is_text_mime_type(&mime_type) {
        bail!(
            "{} has mime type '{mime_type}'; only text files can be imported",
            resource.file_path().display()
        );
    }

    let path = resource.file_path();
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut parser = parser_kind_for(resource).build();
    let mut buffer = vec![0; dstore_core::CHUNK_SIZE];
    let header = loop {
        if let Some(row) = parser.next_record() {
            break row;
        }
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("read {}", path.display()))?;
        if read == 0 {
            parser.finish()?;
            match parser.next_record() {
                Some(row) => break row,
                None => bail!("{} is empty", path.display()),
            }
        }
        parser.feed(&buffer[..read])?;
    };

    Ok(SchemaSanitizer::default().sanitize(&header)?)
}
