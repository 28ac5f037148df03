//! Storage layer for atomic file operations.

mod atomic_file;
mod atomic_json;

pub use atomic_file::{FileLock, write_atomic};
pub use atomic_json::AtomicJsonFile;

use replyflow_core::ReplyflowError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("Background task failed: {0}")]
    Join(String),
}

impl From<StorageError> for ReplyflowError {
    fn from(err: StorageError) -> Self {
        ReplyflowError::storage(err.to_string())
    }
}
