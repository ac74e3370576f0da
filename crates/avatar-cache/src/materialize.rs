//! Cache directory management and the download pipeline

use crate::error::{AvatarCacheError, Result};
use crate::transport::BlobTransport;
use crate::types::CacheConfig;
use chrono::Utc;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

static PART_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Make sure `dir` exists, creating intermediate directories as needed
pub async fn ensure_directory(dir: &Path) -> Result<()> {
    match fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        _ => {
            fs::create_dir_all(dir).await?;
            info!(dir = ?dir, "Created cache directory");
            Ok(())
        }
    }
}

/// Pick the local filename for a blob.
///
/// Uses the URL's last path segment so re-used remote names map onto the
/// same file, else `{entity_id}_{millis}.{extension}`.
pub fn derive_filename(url: &str, entity_id: &str, extension: &str, now_millis: i64) -> String {
    terminal_segment(url)
        .unwrap_or_else(|| format!("{}_{}.{}", entity_id, now_millis, extension))
}

fn terminal_segment(url: &str) -> Option<String> {
    let segment = match url::Url::parse(url) {
        Ok(parsed) => parsed.path_segments()?.next_back()?.to_string(),
        // Not an absolute URL; treat it as a bare path
        Err(_) => url.split(['?', '#']).next()?.rsplit('/').next()?.to_string(),
    };

    let usable = !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
        && !segment.starts_with('.');
    usable.then_some(segment)
}

/// Downloads blobs into the cache directory
pub struct Materializer {
    config: CacheConfig,
    transport: Arc<dyn BlobTransport>,
}

impl Materializer {
    pub fn new(config: CacheConfig, transport: Arc<dyn BlobTransport>) -> Self {
        Self { config, transport }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.config.cache_dir
    }

    /// Download `url` into the cache and return the absolute local path.
    ///
    /// The body is streamed into a hidden `.part` file that is renamed into
    /// place only once complete, so a returned path is always a whole copy.
    pub async fn download_asset(&self, url: &str, entity_id: &str) -> Result<PathBuf> {
        ensure_directory(&self.config.cache_dir).await?;
        let dir = fs::canonicalize(&self.config.cache_dir).await?;

        let filename = derive_filename(
            url,
            entity_id,
            &self.config.default_extension,
            Utc::now().timestamp_millis(),
        );
        let dest = dir.join(&filename);
        let part = dir.join(format!(
            ".{}.{}.{}.part",
            filename,
            std::process::id(),
            PART_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let response = self.transport.download(url).await?;
        if !response.is_success() {
            warn!(url, status = response.status, entity_id, "Blob download failed");
            return Err(AvatarCacheError::Transport(format!(
                "download of {} returned status {}",
                url, response.status
            )));
        }

        match write_stream(&part, response.body).await {
            Ok(size) => {
                fs::rename(&part, &dest).await.inspect_err(|_| {
                    discard_part(&part);
                })?;
                debug!(url, entity_id, path = ?dest, size, "Downloaded blob");
                Ok(dest)
            }
            Err(e) => {
                discard_part(&part);
                Err(e)
            }
        }
    }
}

async fn write_stream(path: &Path, mut body: crate::transport::ByteStream) -> Result<u64> {
    let mut file = fs::File::create(path).await?;
    let mut size = 0u64;

    while let Some(chunk) = body.next().await {
        let chunk = chunk
            .map_err(|e| AvatarCacheError::Transport(format!("body stream failed: {}", e)))?;
        file.write_all(&chunk).await?;
        size += chunk.len() as u64;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(size)
}

/// Best-effort removal of an abandoned partial download
fn discard_part(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = ?path, error = %e, "Failed to remove partial download");
        }
    }
}
