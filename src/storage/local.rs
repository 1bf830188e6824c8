//! File-backed key-value store, the local counterpart of browser storage.
//!
//! Each key is one JSON document under the data directory. Writes go to a
//! temporary file first and are renamed into place.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::StorageError;

pub const SETTINGS_KEY: &str = "prisma_settings";
pub const CHATS_KEY: &str = "prisma_chats";
pub const PROJECTS_KEY: &str = "prisma_projects";
pub const ENCRYPTION_KEY: &str = "prisma_encryption_key_v1";

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: Arc<PathBuf>,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "Local store opened");
        Ok(Self { dir: Arc::new(dir) })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Read the raw document stored under `key`.
    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the document stored under `key`.
    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        let tmp = self
            .dir
            .join(format!(".{key}.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, value).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        match self.get(key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
    ) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        assert_eq!(store.get("prisma_chats").await.unwrap(), None);

        store.set("prisma_chats", "[]").await.unwrap();
        assert_eq!(store.get("prisma_chats").await.unwrap().as_deref(), Some("[]"));

        store.set("prisma_chats", "[1]").await.unwrap();
        assert_eq!(store.get("prisma_chats").await.unwrap().as_deref(), Some("[1]"));

        store.remove("prisma_chats").await.unwrap();
        assert_eq!(store.get("prisma_chats").await.unwrap(), None);
        store.remove("prisma_chats").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();

        let err = store.set("../escape", "x").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path().join("nested")).await.unwrap();

        store.set_json("numbers", &vec![1, 2, 3]).await.unwrap();
        let back: Option<Vec<i32>> = store.get_json("numbers").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }
}
