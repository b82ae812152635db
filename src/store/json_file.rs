//! JSON file store for processed ids.
//!
//! The set is persisted as a flat JSON array of strings. Writes go through
//! a temp file followed by a rename so a crash mid-save never leaves a
//! truncated store behind.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;

use super::{ProcessedIdStore, Result, StoreError};

/// File-backed [`ProcessedIdStore`].
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Creates a store at the given path. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProcessedIdStore for JsonFileStore {
    async fn load(&self) -> Result<HashSet<String>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashSet::new());
            }
            Err(e) => return Err(StoreError::Io(e)),
        };

        let ids: Vec<String> = serde_json::from_slice(&data)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", self.path.display(), e)))?;

        Ok(ids.into_iter().collect())
    }

    async fn save(&self, ids: &HashSet<String>) -> Result<()> {
        // Stable output ordering keeps the file diffable.
        let mut sorted: Vec<&String> = ids.iter().collect();
        sorted.sort();

        let data = serde_json::to_vec(&sorted)
            .map_err(|e| StoreError::Corrupt(format!("serialize failed: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, &data).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        tracing::debug!(count = ids.len(), path = %self.path.display(), "processed ids saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn missing_file_loads_empty_set() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("processed.json"));

        let ids = store.load().await.unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("processed.json"));

        let mut ids = HashSet::new();
        ids.insert("<m1@example.com>".to_string());
        ids.insert("42".to_string());

        store.save(&ids).await.unwrap();
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, ids);
    }

    #[tokio::test]
    async fn save_overwrites_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("processed.json"));

        let first: HashSet<String> = ["a".to_string()].into_iter().collect();
        store.save(&first).await.unwrap();

        let second: HashSet<String> = ["b".to_string(), "c".to_string()].into_iter().collect();
        store.save(&second).await.unwrap();

        assert_eq!(store.load().await.unwrap(), second);
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let store = JsonFileStore::new(path);
        assert!(matches!(
            store.load().await,
            Err(StoreError::Corrupt(_))
        ));
    }
}
