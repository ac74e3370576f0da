use crate::error::{AvatarSyncError, Result};
use avatar_cache::CacheConfig;
use profile_store_client::ProfileStoreConfig;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub cache: CacheConfig,
    pub metadata_path: PathBuf,
    pub profile_store: ProfileStoreConfig,
}

impl Config {
    /// Parse configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary variable source
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = CacheConfig::default();
        let cache = CacheConfig {
            cache_dir: var("AVATAR_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            default_extension: var("AVATAR_DEFAULT_EXTENSION")
                .unwrap_or(defaults.default_extension),
        };

        let metadata_path = var("AVATAR_METADATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./cache/avatar-metadata.json"));

        let timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(s) => s.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                AvatarSyncError::Config(format!("invalid HTTP_TIMEOUT_SECS: {}", s))
            })?,
            None => Duration::from_secs(30),
        };

        let store_defaults = ProfileStoreConfig::default();
        let profile_store = ProfileStoreConfig {
            base_url: var("PROFILE_STORE_URL").unwrap_or(store_defaults.base_url),
            api_key: var("PROFILE_STORE_API_KEY").filter(|k| !k.is_empty()),
            table: var("PROFILE_STORE_TABLE").unwrap_or(store_defaults.table),
            bucket: var("PROFILE_STORE_BUCKET").unwrap_or(store_defaults.bucket),
            timeout,
        };

        Ok(Self {
            cache,
            metadata_path,
            profile_store,
        })
    }
}
