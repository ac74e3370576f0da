//! Per-entity cache metadata on top of a key-value backend

use crate::error::Result;
use crate::kv::KeyValueStore;
use crate::types::{CacheEntry, MetadataField};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const KEY_PREFIX: &str = "avatar";

/// Maps `(entity, field)` pairs onto keys of the underlying store
#[derive(Clone)]
pub struct MetadataStore {
    backend: Arc<dyn KeyValueStore>,
}

impl MetadataStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Composite key for one field of one entity
    pub fn key(entity_id: &str, field: MetadataField) -> String {
        format!("{}_{}_{}", KEY_PREFIX, field.as_str(), entity_id)
    }

    pub async fn get(&self, entity_id: &str, field: MetadataField) -> Result<Option<String>> {
        self.backend.get(&Self::key(entity_id, field)).await
    }

    pub async fn set(&self, entity_id: &str, field: MetadataField, value: &str) -> Result<()> {
        self.backend.set(&Self::key(entity_id, field), value).await
    }

    pub async fn remove(&self, entity_id: &str, field: MetadataField) -> Result<()> {
        self.backend.remove(&Self::key(entity_id, field)).await
    }

    pub async fn local_path(&self, entity_id: &str) -> Result<Option<PathBuf>> {
        Ok(self
            .get(entity_id, MetadataField::LocalPath)
            .await?
            .map(PathBuf::from))
    }

    pub async fn synced_at(&self, entity_id: &str) -> Result<Option<String>> {
        self.get(entity_id, MetadataField::SyncedAt).await
    }

    /// Both fields as read, without checking the filesystem
    pub async fn entry(&self, entity_id: &str) -> Result<CacheEntry> {
        Ok(CacheEntry {
            entity_id: entity_id.to_string(),
            local_path: self.local_path(entity_id).await?,
            synced_at: self.synced_at(entity_id).await?,
        })
    }

    /// Record a new cached copy.
    ///
    /// `local_path` is written before `synced_at`: an interrupted save leaves
    /// no timestamp behind, which the next sync treats as never synced.
    pub async fn save(&self, entity_id: &str, local_path: &Path, synced_at: &str) -> Result<()> {
        self.set(
            entity_id,
            MetadataField::LocalPath,
            &local_path.to_string_lossy(),
        )
        .await?;
        self.set(entity_id, MetadataField::SyncedAt, synced_at).await?;
        debug!(entity_id, path = ?local_path, synced_at, "Saved cache metadata");
        Ok(())
    }

    /// Forget both fields for an entity
    pub async fn purge(&self, entity_id: &str) -> Result<()> {
        self.remove(entity_id, MetadataField::LocalPath).await?;
        self.remove(entity_id, MetadataField::SyncedAt).await?;
        debug!(entity_id, "Purged cache metadata");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKeyValueStore;

    fn store() -> (Arc<MemoryKeyValueStore>, MetadataStore) {
        let backend = Arc::new(MemoryKeyValueStore::new());
        (backend.clone(), MetadataStore::new(backend))
    }

    #[test]
    fn test_key_layout() {
        assert_eq!(
            MetadataStore::key("u1", MetadataField::LocalPath),
            "avatar_local_path_u1"
        );
        assert_eq!(
            MetadataStore::key("u1", MetadataField::SyncedAt),
            "avatar_synced_at_u1"
        );
    }

    #[tokio::test]
    async fn test_save_writes_both_keys() {
        let (backend, meta) = store();
        meta.save("u1", Path::new("/c/a.jpg"), "2024-01-01T00:00:00Z")
            .await
            .unwrap();

        assert_eq!(
            backend.get("avatar_local_path_u1").await.unwrap(),
            Some("/c/a.jpg".to_string())
        );
        assert_eq!(
            backend.get("avatar_synced_at_u1").await.unwrap(),
            Some("2024-01-01T00:00:00Z".to_string())
        );
    }

    #[tokio::test]
    async fn test_entry_and_purge() {
        let (_, meta) = store();
        meta.save("u1", Path::new("/c/a.jpg"), "2024-01-01T00:00:00Z")
            .await
            .unwrap();

        let entry = meta.entry("u1").await.unwrap();
        assert_eq!(entry.local_path, Some(PathBuf::from("/c/a.jpg")));
        assert_eq!(entry.synced_at.as_deref(), Some("2024-01-01T00:00:00Z"));

        meta.purge("u1").await.unwrap();
        let entry = meta.entry("u1").await.unwrap();
        assert_eq!(entry.local_path, None);
        assert_eq!(entry.synced_at, None);
    }

    #[tokio::test]
    async fn test_entities_are_isolated() {
        let (_, meta) = store();
        meta.save("u1", Path::new("/c/a.jpg"), "2024-01-01T00:00:00Z")
            .await
            .unwrap();

        assert_eq!(meta.local_path("u2").await.unwrap(), None);
        meta.purge("u2").await.unwrap();
        assert!(meta.local_path("u1").await.unwrap().is_some());
    }
}
