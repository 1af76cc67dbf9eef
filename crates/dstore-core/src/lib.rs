//! Resumable chunked import of tabular files.
//!
//! [`ImportEngine::run`] imports a resource for a bounded slice of time and
//! returns. Progress is kept in a [`Checkpoint`](dstore_model::Checkpoint)
//! that only advances after a chunk's records are stored, so the next call
//! (in this process or, via [`JobState`], in another one) picks up where the
//! last committed chunk ended.
//!
//! [`JobRunner`] wraps the engine for command line use: it loads saved state,
//! runs passes, and saves state atomically after each one.

pub mod clock;
pub mod engine;
pub mod error;
pub mod factory;
pub mod options;
pub mod runner;
pub mod state;

pub use clock::{Clock, SystemClock, TickClock};
pub use engine::ImportEngine;
pub use error::{CoreError, Result};
pub use factory::{build_storage, create_engine, parser_kind_for};
pub use options::{CHUNK_SIZE, ImportOptions};
pub use runner::{JobRunner, RunSummary};
pub use state::JobState;
