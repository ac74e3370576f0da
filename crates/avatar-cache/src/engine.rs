//! Sync engine: fast-path reads, staleness-driven sync, forced refresh and
//! post-upload caching.

use crate::error::{AvatarCacheError, Result};
use crate::kv::KeyValueStore;
use crate::materialize::Materializer;
use crate::metadata::MetadataStore;
use crate::remote::RecordStore;
use crate::transport::BlobTransport;
use crate::types::{format_timestamp, parse_timestamp, CacheConfig, CacheEntry, SyncOutcome};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

type EntityLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Whether the local copy must be replaced.
///
/// A missing remote timestamp is always treated as possibly newer.
pub fn needs_download(local: Option<DateTime<Utc>>, remote: Option<DateTime<Utc>>) -> bool {
    match (local, remote) {
        (None, _) => true,
        (Some(_), None) => true,
        (Some(local), Some(remote)) => remote > local,
    }
}

/// Local-first cache of one remote asset per entity
pub struct AvatarCache {
    metadata: MetadataStore,
    materializer: Materializer,
    records: Arc<dyn RecordStore>,
    /// Serializes mutating operations per entity
    locks: EntityLocks,
}

/// Held for the duration of a mutating operation on one entity.
///
/// The registry entry is dropped with the last guard or waiter, never while
/// anyone still holds or awaits the lock.
struct EntityGuard {
    guard: Option<OwnedMutexGuard<()>>,
    entity_id: String,
    locks: EntityLocks,
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        // Unlock first so only the registry and other callers hold references
        drop(self.guard.take());
        self.locks
            .remove_if(&self.entity_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl AvatarCache {
    pub fn new(
        config: CacheConfig,
        metadata: Arc<dyn KeyValueStore>,
        records: Arc<dyn RecordStore>,
        transport: Arc<dyn BlobTransport>,
    ) -> Self {
        Self {
            metadata: MetadataStore::new(metadata),
            materializer: Materializer::new(config, transport),
            records,
            locks: Arc::new(DashMap::new()),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        self.materializer.cache_dir()
    }

    async fn lock_entity(&self, entity_id: &str) -> EntityGuard {
        // Clone out of the map so no shard lock is held across the await
        let lock = self
            .locks
            .entry(entity_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();

        EntityGuard {
            guard: Some(lock.lock_owned().await),
            entity_id: entity_id.to_string(),
            locks: self.locks.clone(),
        }
    }

    /// Cached path for an entity, if the file is still on disk.
    ///
    /// No network I/O. When metadata points at a file that has disappeared,
    /// the entry is purged and `None` is returned.
    pub async fn get_local_avatar(&self, entity_id: &str) -> Option<PathBuf> {
        let path = match self.metadata.local_path(entity_id).await {
            Ok(Some(path)) => path,
            Ok(None) => return None,
            Err(e) => {
                warn!(entity_id, error = %e, "Failed to read cache metadata");
                return None;
            }
        };

        match fs::try_exists(&path).await {
            Ok(true) => Some(path),
            Ok(false) => {
                warn!(entity_id, path = ?path, "Cached file missing, purging metadata");
                if let Err(e) = self.metadata.purge(entity_id).await {
                    warn!(entity_id, error = %e, "Failed to purge cache metadata");
                }
                None
            }
            Err(e) => {
                warn!(entity_id, path = ?path, error = %e, "Failed to check cached file");
                None
            }
        }
    }

    /// Raw metadata for an entity, without checking the filesystem
    pub async fn cached_entry(&self, entity_id: &str) -> Result<CacheEntry> {
        self.metadata.entry(entity_id).await
    }

    /// Bring the local copy up to date with the remote record.
    ///
    /// Never fails: when the remote cannot be consulted or the download
    /// breaks, the last known good copy is returned instead.
    pub async fn sync_avatar(&self, entity_id: &str) -> SyncOutcome {
        let _guard = self.lock_entity(entity_id).await;

        match self.try_sync(entity_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(entity_id, error = %e, "Avatar sync failed");
                self.fallback(entity_id, e.to_string()).await
            }
        }
    }

    async fn try_sync(&self, entity_id: &str) -> Result<SyncOutcome> {
        let record = self.records.read_record(entity_id).await?;
        let Some(asset_url) = record.asset_url.filter(|url| !url.is_empty()) else {
            debug!(entity_id, "Remote record has no asset");
            return Ok(self
                .fallback(entity_id, "remote record has no asset".to_string())
                .await);
        };

        // A timestamp only counts while the file it describes is present
        let local = match self.get_local_avatar(entity_id).await {
            Some(path) => self
                .metadata
                .synced_at(entity_id)
                .await?
                .as_deref()
                .and_then(parse_timestamp)
                .map(|synced_at| (path, synced_at)),
            None => None,
        };

        if let Some((path, synced_at)) = &local {
            if !needs_download(Some(*synced_at), record.updated_at) {
                debug!(entity_id, path = ?path, "Cached avatar is current");
                return Ok(SyncOutcome::Current(path.clone()));
            }
        }

        let path = self
            .materializer
            .download_asset(&asset_url, entity_id)
            .await?;

        let synced_at = match (record.updated_at, local) {
            (Some(remote), _) => remote,
            (None, Some((_, previous))) => previous.max(Utc::now()),
            (None, None) => Utc::now(),
        };
        self.metadata
            .save(entity_id, &path, &format_timestamp(synced_at))
            .await?;

        info!(entity_id, path = ?path, "Avatar synced");
        Ok(SyncOutcome::Downloaded(path))
    }

    async fn fallback(&self, entity_id: &str, reason: String) -> SyncOutcome {
        match self.get_local_avatar(entity_id).await {
            Some(path) => {
                debug!(entity_id, path = ?path, reason = %reason, "Serving cached avatar");
                SyncOutcome::StaleFallback { path, reason }
            }
            None => SyncOutcome::Miss,
        }
    }

    /// Download the remote asset unconditionally and adopt the remote state
    pub async fn force_refresh_avatar(&self, entity_id: &str) -> Result<PathBuf> {
        let _guard = self.lock_entity(entity_id).await;

        self.try_force_refresh(entity_id).await.inspect_err(|e| {
            error!(entity_id, error = %e, "Force refresh failed");
        })
    }

    async fn try_force_refresh(&self, entity_id: &str) -> Result<PathBuf> {
        let record = self.records.read_record(entity_id).await?;
        let asset_url = record
            .asset_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| {
                AvatarCacheError::NotFound(format!("no remote avatar for {}", entity_id))
            })?;

        let path = self
            .materializer
            .download_asset(&asset_url, entity_id)
            .await?;
        let synced_at = record.updated_at.unwrap_or_else(Utc::now);
        self.metadata
            .save(entity_id, &path, &format_timestamp(synced_at))
            .await?;

        info!(entity_id, path = ?path, "Avatar force refreshed");
        Ok(path)
    }

    /// Cache a blob the caller just uploaded.
    ///
    /// With `commit` false the file is downloaded for display but metadata
    /// is left alone until [`AvatarCache::commit_avatar`] is called.
    pub async fn cache_uploaded_avatar(
        &self,
        entity_id: &str,
        asset_url: &str,
        commit: bool,
    ) -> Result<PathBuf> {
        let _guard = self.lock_entity(entity_id).await;

        let path = self
            .materializer
            .download_asset(asset_url, entity_id)
            .await?;

        if commit {
            self.metadata
                .save(entity_id, &path, &format_timestamp(Utc::now()))
                .await?;
            info!(entity_id, path = ?path, "Uploaded avatar cached");
        } else {
            debug!(entity_id, path = ?path, "Uploaded avatar staged");
        }

        Ok(path)
    }

    /// Make a staged file the entity's cached copy
    pub async fn commit_avatar(
        &self,
        entity_id: &str,
        local_path: &Path,
        synced_at: DateTime<Utc>,
    ) -> Result<()> {
        let _guard = self.lock_entity(entity_id).await;

        if !fs::try_exists(local_path).await? {
            return Err(AvatarCacheError::Storage(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("staged avatar {} no longer exists", local_path.display()),
            ))));
        }

        self.metadata
            .save(entity_id, local_path, &format_timestamp(synced_at))
            .await?;
        info!(entity_id, path = ?local_path, "Staged avatar committed");
        Ok(())
    }
}
