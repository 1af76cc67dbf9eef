//! Storage adapters for imported records.
//!
//! The import engine writes through the [`StorageAdapter`] trait. Two
//! backends are provided: [`MemoryStorage`] for tests and one-shot imports,
//! and [`LogStorage`], an append-only record log in a directory that can be
//! reopened by a later process.
//!
//! Both backends key records by their row number, so storing a row again
//! overwrites it.

pub mod adapter;
pub mod atomic;
pub mod error;
pub mod log;
pub mod memory;

pub use adapter::{RecordId, StorageAdapter, StorageKind, open_storage};
pub use atomic::write_atomic;
pub use error::{Result, StorageError};
pub use log::LogStorage;
pub use memory::MemoryStorage;
