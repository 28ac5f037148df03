//! JSON documents updated under a file lock.

use super::StorageError;
use super::atomic_file::{FileLock, write_atomic};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// A handle to a JSON file shared between processes.
///
/// Every [`AtomicJsonFile::update`] reloads the document while holding an
/// exclusive lock, applies the change and writes the result atomically, so
/// concurrent writers never lose each other's changes.
pub struct AtomicJsonFile<T> {
    path: PathBuf,
    _phantom: PhantomData<T>,
}

impl<T> AtomicJsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _phantom: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the document. A missing or empty file yields `T::default()`.
    pub fn load(&self) -> Result<T, StorageError> {
        if !self.path.exists() {
            return Ok(T::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(T::default());
        }

        serde_json::from_str(&content).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })
    }

    pub fn save(&self, data: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(data).map_err(|source| StorageError::Json {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, json.as_bytes())
    }

    /// Locked read-modify-write. Returns whatever `f` returns.
    pub fn update<R, F>(&self, f: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut T) -> R,
    {
        let _lock = FileLock::acquire(&self.path)?;
        let mut data = self.load()?;
        let result = f(&mut data);
        self.save(&data)?;
        Ok(result)
    }
}
