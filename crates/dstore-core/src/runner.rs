//! Repeated passes over an import with state saved in between.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use dstore_model::{Checkpoint, ImportError, ImportResult, Resource};
use dstore_storage::write_atomic;

use crate::engine::ImportEngine;
use crate::error::{CoreError, Result};
use crate::factory::create_engine;
use crate::options::ImportOptions;
use crate::state::JobState;

/// Outcome of [`JobRunner::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub passes: u32,
    pub result: ImportResult,
    pub checkpoint: Checkpoint,
}

/// Runs an import pass by pass, saving job state after every pass.
#[derive(Debug, Clone)]
pub struct JobRunner {
    state_path: PathBuf,
    storage_dir: Option<PathBuf>,
    options: ImportOptions,
}

impl JobRunner {
    pub fn new(state_path: impl Into<PathBuf>, options: ImportOptions) -> Self {
        Self {
            state_path: state_path.into(),
            storage_dir: None,
            options,
        }
    }

    /// Directory handed to on-disk storage backends.
    #[must_use]
    pub fn with_storage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage_dir = Some(dir.into());
        self
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Read the saved job state, if any.
    pub fn load_state(&self) -> Result<Option<JobState>> {
        match fs::read_to_string(&self.state_path) {
            Ok(json) => Ok(Some(JobState::from_json(&json)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CoreError::io("read", &self.state_path, e)),
        }
    }

    /// Resume the saved import, or start a new one for `resource`.
    pub fn open(&self, resource: Option<Resource>, storage_kind: &str) -> Result<ImportEngine> {
        self.options.validate()?;
        if let Some(state) = self.load_state()? {
            if let Some(resource) = &resource
                && resource != &state.resource
            {
                return Err(ImportError::State {
                    message: format!(
                        "{} belongs to resource '{}', not '{}'",
                        self.state_path.display(),
                        state.resource.id(),
                        resource.id()
                    ),
                }
                .into());
            }
            if state.storage != storage_kind {
                warn!(
                    saved = %state.storage,
                    requested = storage_kind,
                    "Resuming with the storage recorded in the job state"
                );
            }
            info!(
                "Resuming import of '{}' from {}",
                state.resource.id(),
                self.state_path.display()
            );
            return Ok(state.open(self.storage_dir(), self.options.clone())?);
        }

        let resource = resource.ok_or_else(|| CoreError::MissingResource {
            path: self.state_path.clone(),
        })?;
        info!("Starting new import of '{}'", resource.id());
        Ok(create_engine(
            resource,
            storage_kind,
            self.storage_dir(),
            self.options.clone(),
        )?)
    }

    /// Write the engine's state atomically.
    pub fn save(&self, engine: &ImportEngine) -> Result<()> {
        let json = engine.serialize()?;
        write_atomic(&self.state_path, json.as_bytes())?;
        tracing::debug!("Saved job state to {}", self.state_path.display());
        Ok(())
    }

    /// Delete the saved state. Returns false if there was none.
    pub fn remove_state(&self) -> Result<bool> {
        match fs::remove_file(&self.state_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(CoreError::io("remove", &self.state_path, e)),
        }
    }

    /// Run passes until the import finishes or `max_passes` is reached.
    pub fn run(&self, engine: &mut ImportEngine) -> Result<RunSummary> {
        let budget = self.options.pass_budget();
        let mut passes = 0u32;
        loop {
            let result = engine.run(budget);
            passes += 1;
            self.save(engine)?;

            if result.is_terminal() {
                info!(
                    resource = %engine.resource().id(),
                    status = %result.status(),
                    passes,
                    "Import finished"
                );
                break;
            }
            if let Some(max) = self.options.max_passes
                && passes >= max
            {
                if engine.storage().kind().is_durable() {
                    info!(
                        resource = %engine.resource().id(),
                        passes,
                        "Reached pass limit, import will resume on the next run"
                    );
                } else {
                    warn!(
                        resource = %engine.resource().id(),
                        passes,
                        storage = %engine.storage().kind(),
                        "Reached pass limit; stored records are lost on exit and the import cannot resume"
                    );
                }
                break;
            }
        }

        Ok(RunSummary {
            passes,
            result: engine.result().clone(),
            checkpoint: engine.checkpoint(),
        })
    }
}
