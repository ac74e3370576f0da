//! Core types for the avatar cache

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Metadata recorded for one entity's cached asset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub entity_id: String,
    pub local_path: Option<PathBuf>,
    /// RFC 3339 timestamp of the remote state the local file reflects
    pub synced_at: Option<String>,
}

impl CacheEntry {
    /// Parsed `synced_at`, or `None` when absent or unparseable
    pub fn synced_at_time(&self) -> Option<DateTime<Utc>> {
        self.synced_at.as_deref().and_then(parse_timestamp)
    }
}

/// The two metadata fields kept per entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    LocalPath,
    SyncedAt,
}

impl MetadataField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataField::LocalPath => "local_path",
            MetadataField::SyncedAt => "synced_at",
        }
    }
}

/// Authoritative record held by the remote store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteRecord {
    pub asset_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields written back to the remote record after a profile edit
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordUpdate {
    #[serde(rename = "avatar_url", skip_serializing_if = "Option::is_none")]
    pub asset_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// Which path `sync_avatar` took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote was newer (or unknown) and a fresh copy was downloaded
    Downloaded(PathBuf),
    /// The local copy already reflects the remote record
    Current(PathBuf),
    /// The remote could not be consulted; serving the last known good copy
    StaleFallback { path: PathBuf, reason: String },
    /// Nothing cached and nothing could be fetched
    Miss,
}

impl SyncOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            SyncOutcome::Downloaded(path) | SyncOutcome::Current(path) => Some(path),
            SyncOutcome::StaleFallback { path, .. } => Some(path),
            SyncOutcome::Miss => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            SyncOutcome::Downloaded(path) | SyncOutcome::Current(path) => Some(path),
            SyncOutcome::StaleFallback { path, .. } => Some(path),
            SyncOutcome::Miss => None,
        }
    }

    /// True when the returned path is known to reflect the remote record
    pub fn is_fresh(&self) -> bool {
        matches!(self, SyncOutcome::Downloaded(_) | SyncOutcome::Current(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SyncOutcome::Downloaded(_) => "downloaded",
            SyncOutcome::Current(_) => "current",
            SyncOutcome::StaleFallback { .. } => "stale-fallback",
            SyncOutcome::Miss => "miss",
        }
    }
}

/// Configuration for the on-disk cache
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_dir: PathBuf,
    /// Extension used when a filename cannot be derived from the URL
    pub default_extension: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./cache/avatars"),
            default_extension: "jpg".to_string(),
        }
    }
}

/// Format a timestamp the way it is persisted in metadata
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a persisted or remote timestamp (RFC 3339, any offset)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.cache_dir, PathBuf::from("./cache/avatars"));
        assert_eq!(config.default_extension, "jpg");
    }

    #[test]
    fn test_metadata_field_names() {
        assert_eq!(MetadataField::LocalPath.as_str(), "local_path");
        assert_eq!(MetadataField::SyncedAt.as_str(), "synced_at");
    }

    #[test]
    fn test_format_timestamp_whole_seconds() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_timestamp(ts), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        let parsed = parse_timestamp("2024-01-01T02:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_timestamp_invalid() {
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_entry_synced_at_time() {
        let entry = CacheEntry {
            entity_id: "u1".to_string(),
            local_path: None,
            synced_at: Some("2024-01-01T00:00:00Z".to_string()),
        };
        assert!(entry.synced_at_time().is_some());

        let garbled = CacheEntry {
            synced_at: Some("not a date".to_string()),
            ..entry
        };
        assert!(garbled.synced_at_time().is_none());
    }

    #[test]
    fn test_sync_outcome_accessors() {
        let downloaded = SyncOutcome::Downloaded(PathBuf::from("/c/a.jpg"));
        assert!(downloaded.is_fresh());
        assert_eq!(downloaded.path(), Some(Path::new("/c/a.jpg")));

        let fallback = SyncOutcome::StaleFallback {
            path: PathBuf::from("/c/a.jpg"),
            reason: "offline".to_string(),
        };
        assert!(!fallback.is_fresh());
        assert_eq!(fallback.kind(), "stale-fallback");
        assert_eq!(fallback.into_path(), Some(PathBuf::from("/c/a.jpg")));

        assert_eq!(SyncOutcome::Miss.path(), None);
    }

    #[test]
    fn test_record_update_serialization_skips_unset() {
        let update = RecordUpdate {
            asset_url: Some("https://x/a.jpg".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_string(&update).unwrap();
        assert_eq!(json, r#"{"avatar_url":"https://x/a.jpg"}"#);
    }
}
