use crate::storage::{AtomicJsonFile, StorageError};
use async_trait::async_trait;
use replyflow_core::Result;
use replyflow_core::contact::{ContactRemark, ContactRemarkStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// On-disk layout: a JSON object keyed by target id.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
struct ContactDocument(BTreeMap<String, ContactRemark>);

/// Contact remarks persisted in one JSON file shared by all sessions and
/// processes.
///
/// Nothing is cached: every call reloads the file, and `set` runs under the
/// file lock so concurrent writers never drop each other's entries.
#[derive(Clone)]
pub struct JsonContactStore {
    file: Arc<AtomicJsonFile<ContactDocument>>,
}

impl JsonContactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path.into())),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    async fn blocking<R, F>(&self, f: F) -> std::result::Result<R, StorageError>
    where
        R: Send + 'static,
        F: FnOnce(&AtomicJsonFile<ContactDocument>) -> std::result::Result<R, StorageError>
            + Send
            + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| StorageError::Join(e.to_string()))?
    }
}

#[async_trait]
impl ContactRemarkStore for JsonContactStore {
    async fn get(&self, target_id: &str) -> Result<Option<ContactRemark>> {
        let target_id = target_id.to_string();
        let contact = self
            .blocking(move |file| Ok(file.load()?.0.remove(&target_id)))
            .await?;
        Ok(contact)
    }

    async fn set(
        &self,
        target_id: &str,
        display_name: &str,
        remark: Option<&str>,
    ) -> Result<ContactRemark> {
        let target_id = target_id.to_string();
        let display_name = display_name.to_string();
        let remark = remark.map(str::to_string);

        let contact = self
            .blocking(move |file| {
                file.update(|doc| {
                    let entry = doc
                        .0
                        .entry(target_id.clone())
                        .or_insert_with(|| ContactRemark {
                            target_id: target_id.clone(),
                            display_name: display_name.clone(),
                            remark: None,
                        });
                    entry.display_name = display_name;
                    if remark.is_some() {
                        entry.remark = remark;
                    }
                    entry.clone()
                })
            })
            .await?;

        tracing::debug!(target_id = %contact.target_id, "contact remark saved");
        Ok(contact)
    }

    async fn list(&self) -> Result<Vec<ContactRemark>> {
        let contacts = self
            .blocking(|file| Ok(file.load()?.0.into_values().collect()))
            .await?;
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_set_then_get() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonContactStore::new(temp_dir.path().join("contacts.json"));

        assert!(store.get("42").await.unwrap().is_none());

        let saved = store.set("42", "Bob", Some("Bob (supplier)")).await.unwrap();
        assert_eq!(saved.preferred_name(), "Bob (supplier)");

        let loaded = store.get("42").await.unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_set_without_remark_keeps_existing_remark() {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonContactStore::new(temp_dir.path().join("contacts.json"));

        store.set("42", "Bob", Some("supplier")).await.unwrap();
        let renamed = store.set("42", "Robert", None).await.unwrap();

        assert_eq!(renamed.display_name, "Robert");
        assert_eq!(renamed.remark.as_deref(), Some("supplier"));
    }

    #[tokio::test]
    async fn test_two_stores_share_one_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contacts.json");
        let first = JsonContactStore::new(&path);
        let second = JsonContactStore::new(&path);

        first.set("1", "Alice", None).await.unwrap();
        second.set("2", "Bob", None).await.unwrap();

        let ids: Vec<String> = first
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.target_id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(second.get("1").await.unwrap().unwrap().display_name, "Alice");
    }

    #[tokio::test]
    async fn test_corrupt_document_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("contacts.json");
        std::fs::write(&path, "[1, 2").unwrap();
        let store = JsonContactStore::new(&path);

        let err = store.get("1").await.unwrap_err();
        assert!(matches!(err, replyflow_core::ReplyflowError::Storage(_)));
    }
}
