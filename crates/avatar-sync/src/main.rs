//! avatar-sync - command-line front end for the local-first avatar cache
//!
//! Reads the cached avatar of an entity, reconciles it with the remote
//! profile store, and runs the upload-then-save flow.

mod config;
mod error;

use crate::config::Config;
use crate::error::Result;
use avatar_cache::{
    AvatarCache, FileKeyValueStore, HttpBlobTransport, RecordUpdate, SyncOutcome,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use profile_store_client::ProfileStoreClient;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "avatar-sync", version, about = "Local-first avatar cache")]
struct Cli {
    /// Entity whose avatar is cached
    #[arg(long, env = "AVATAR_ENTITY_ID")]
    entity_id: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the cached path, without touching the network
    Local,
    /// Reconcile the cache with the remote record
    Sync,
    /// Download the remote avatar unconditionally
    Refresh,
    /// Upload a new avatar, save it on the profile and cache it
    Upload { file: PathBuf },
    /// Print the raw cache metadata
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env().add_directive("avatar_sync=info".parse()?);

    // Use JSON format for GCP Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!("Cache dir: {:?}", config.cache.cache_dir);
    info!("Metadata: {:?}", config.metadata_path);
    info!("Profile store: {}", config.profile_store.base_url);

    let metadata = Arc::new(FileKeyValueStore::open(&config.metadata_path).await?);
    let transport = Arc::new(HttpBlobTransport::with_timeout(
        config.profile_store.timeout,
    )?);
    let store = Arc::new(ProfileStoreClient::new(config.profile_store.clone())?);
    let cache = AvatarCache::new(config.cache.clone(), metadata, store.clone(), transport);

    let entity_id = cli.entity_id.as_str();
    match cli.command {
        Command::Local => {
            if let Some(path) = cache.get_local_avatar(entity_id).await {
                println!("{}", path.display());
            }
        }
        Command::Sync => print_outcome(&cache.sync_avatar(entity_id).await),
        Command::Refresh => {
            let path = cache.force_refresh_avatar(entity_id).await?;
            println!("{}", path.display());
        }
        Command::Upload { file } => {
            let path = upload(&cache, &store, entity_id, &file, &config).await?;
            println!("{}", path.display());
        }
        Command::Show => {
            let entry = cache.cached_entry(entity_id).await?;
            println!(
                "local_path\t{}",
                entry
                    .local_path
                    .as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default()
            );
            println!("synced_at\t{}", entry.synced_at.unwrap_or_default());
        }
    }

    Ok(())
}

fn print_outcome(outcome: &SyncOutcome) {
    match outcome.path() {
        Some(path) => println!("{}\t{}", outcome.kind(), path.display()),
        None => println!("{}", outcome.kind()),
    }
}

/// Upload, stage the new file for display, save the profile, then commit
/// the staged file as the cached copy
async fn upload(
    cache: &AvatarCache,
    store: &ProfileStoreClient,
    entity_id: &str,
    file: &Path,
    config: &Config,
) -> Result<PathBuf> {
    let data = tokio::fs::read(file).await?;
    let extension = file
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or(&config.cache.default_extension)
        .to_string();

    let url = store.upload_avatar(entity_id, data, &extension).await?;
    info!(entity_id, url = %url, "Avatar uploaded");

    let staged = cache.cache_uploaded_avatar(entity_id, &url, false).await?;

    let update = RecordUpdate {
        asset_url: Some(url),
        ..Default::default()
    };
    store.update_record(entity_id, &update).await?;

    cache.commit_avatar(entity_id, &staged, Utc::now()).await?;
    Ok(staged)
}
