//! Default locations of replyflow files.
//!
//! ```text
//! ~/.config/replyflow/
//! └── config.toml          # Application configuration
//!
//! ~/.local/share/replyflow/
//! ├── contacts.json        # Shared contact remarks
//! └── mailbox/             # File mailbox driver root
//!     └── <account>/
//! ```

use replyflow_core::config::StorageConfig;
use std::path::PathBuf;
use thiserror::Error;

const APP_NAME: &str = "replyflow";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot find the {0} directory")]
    DirNotFound(&'static str),
}

pub struct ReplyflowPaths;

impl ReplyflowPaths {
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::DirNotFound("config"))
    }

    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_NAME))
            .ok_or(PathError::DirNotFound("data"))
    }

    /// `~/.config/replyflow/config.toml`
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// The configured contacts file, or `<data_dir>/contacts.json`.
    pub fn contacts_file(storage: &StorageConfig) -> Result<PathBuf, PathError> {
        match &storage.contacts_file {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("contacts.json")),
        }
    }

    /// The configured mailbox root, or `<data_dir>/mailbox`.
    pub fn mailbox_dir(storage: &StorageConfig) -> Result<PathBuf, PathError> {
        match &storage.mailbox_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("mailbox")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_paths_take_precedence() {
        let storage = StorageConfig {
            contacts_file: Some(PathBuf::from("/tmp/c.json")),
            mailbox_dir: Some(PathBuf::from("/tmp/mail")),
        };
        assert_eq!(
            ReplyflowPaths::contacts_file(&storage).unwrap(),
            PathBuf::from("/tmp/c.json")
        );
        assert_eq!(
            ReplyflowPaths::mailbox_dir(&storage).unwrap(),
            PathBuf::from("/tmp/mail")
        );
    }

    #[test]
    fn test_default_paths_are_namespaced() {
        if let Ok(path) = ReplyflowPaths::config_file() {
            assert!(path.ends_with("replyflow/config.toml"));
        }
        if let Ok(path) = ReplyflowPaths::contacts_file(&StorageConfig::default()) {
            assert!(path.ends_with("replyflow/contacts.json"));
        }
    }
}
