//! # Local Storage
//!
//! Durable key/value storage on the shopper's device. The guest cart and the
//! per-user advisory snapshots are the only records kept here.
//!
//! Calls are synchronous. Writes follow last-write-wins semantics when more
//! than one process shares the same storage root.
//!
//! ## Implementations
//!
//! - [`FsLocalStorage`]: one JSON file per key under a root directory.
//! - [`MemoryLocalStorage`]: process-local map, for tests and embedding.

use std::io;

use mockall::automock;
use thiserror::Error;

mod fs;
mod memory;

pub use fs::FsLocalStorage;
pub use memory::MemoryLocalStorage;

/// Errors raised by a [`LocalStorage`] backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the underlying medium failed.
    #[error("storage io error")]
    Io(#[from] io::Error),

    /// Storage is disabled, full or otherwise refusing writes.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable string storage keyed by name.
#[automock]
pub trait LocalStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the medium cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the value could not be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value stored under `key`. Deleting a missing key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] when the value could not be deleted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
