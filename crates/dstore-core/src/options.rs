//! Import configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Default number of bytes read per chunk.
pub const CHUNK_SIZE: usize = 8192;

/// Options controlling how an import is sliced into work.
///
/// Loadable from TOML:
///
/// ```toml
/// chunk_size = 8192
/// time_budget_ms = 2000
/// max_passes = 10
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Bytes read from the file per chunk.
    pub chunk_size: usize,
    /// Wall-clock budget for one pass. `None` runs to completion.
    #[serde(
        rename = "time_budget_ms",
        with = "duration_ms",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_budget: Option<Duration>,
    /// Upper bound on passes made by the job runner. `None` is unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_passes: Option<u32>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            time_budget: None,
            max_passes: None,
        }
    }
}

impl ImportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    #[must_use]
    pub fn with_max_passes(mut self, max_passes: u32) -> Self {
        self.max_passes = Some(max_passes);
        self
    }

    /// Budget for a single pass; unbounded when not configured.
    pub fn pass_budget(&self) -> Duration {
        self.time_budget.unwrap_or(Duration::MAX)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(CoreError::InvalidOptions {
                message: "chunk_size must be greater than zero".to_string(),
            });
        }
        if self.max_passes == Some(0) {
            return Err(CoreError::InvalidOptions {
                message: "max_passes must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Load and validate options from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| CoreError::io("read", path, e))?;
        let options: Self = toml::from_str(&contents).map_err(|e| CoreError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        options.validate()?;
        tracing::debug!("Loaded import options from {}", path.display());
        Ok(options)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                let millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
