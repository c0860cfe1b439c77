//! Storage
//!
//! Durable key/value storage for serialized carts.

use std::io;

use thiserror::Error;

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The key can't be used with this backend.
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    /// Underlying IO failure.
    #[error("storage io error")]
    Io(#[from] io::Error),
}

/// A place to keep serialized state between sessions.
#[cfg_attr(test, mockall::automock)]
pub trait CartStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend can't be read.
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend can't be written.
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Forget the value under `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend can't be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
