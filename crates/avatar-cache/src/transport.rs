//! Blob transport: streaming downloads from the remote store

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::Client;
use std::pin::Pin;
use std::time::Duration;
use tracing::debug;

/// A boxed stream of body chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Status and body of a blob request
pub struct BlobResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: ByteStream,
}

impl BlobResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for BlobResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// Fetches blobs by URL
#[async_trait]
pub trait BlobTransport: Send + Sync {
    /// Start a download. Non-success statuses are returned, not raised;
    /// only connection-level failures are errors.
    async fn download(&self, url: &str) -> Result<BlobResponse>;
}

/// HTTP client for fetching blobs
pub struct HttpBlobTransport {
    client: Client,
}

impl HttpBlobTransport {
    /// Create a transport with the default 30 second timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Reuse an already configured client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobTransport for HttpBlobTransport {
    async fn download(&self, url: &str) -> Result<BlobResponse> {
        debug!(url, "Fetching blob");

        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(std::io::Error::other));

        Ok(BlobResponse {
            status,
            content_type,
            body: Box::pin(body),
        })
    }
}
