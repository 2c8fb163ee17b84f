//! Persistent key-value storage for the Nutri client.
//!
//! The client keeps exactly one durable value, the bearer token, under
//! [`StorageKeys::TOKEN`]. Backends:
//! - [`FileStorage`]: JSON object on disk, rewritten atomically on mutation
//! - [`MemoryStorage`]: process-local map for tests and ephemeral sessions

mod file;
mod keys;
mod memory;
mod traits;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::TokenStorage;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Stored data could not be decoded or encoded
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Encoding(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
