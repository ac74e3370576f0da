//! Profile store HTTP client

use crate::error::{ProfileStoreError, Result};
use crate::types::{ProfileRow, ProfileStoreConfig};
use async_trait::async_trait;
use avatar_cache::{RecordStore, RecordUpdate, RemoteRecord};
use chrono::Utc;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, warn};

/// Client for the REST record API and the object storage API of the
/// profile backend
pub struct ProfileStoreClient {
    http: Client,
    config: ProfileStoreConfig,
}

impl ProfileStoreClient {
    pub fn new(config: ProfileStoreConfig) -> Result<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// URL selecting the avatar columns of one profile row
    pub fn record_url(&self, entity_id: &str) -> String {
        format!("{}&select=avatar_url,updated_at", self.row_url(entity_id))
    }

    /// URL addressing one profile row
    pub fn row_url(&self, entity_id: &str) -> String {
        format!(
            "{}/rest/v1/{}?id=eq.{}",
            self.base_url(),
            urlencoding::encode(&self.config.table),
            urlencoding::encode(entity_id)
        )
    }

    /// Object name for a freshly uploaded avatar
    pub fn object_name(entity_id: &str, extension: &str, now_millis: i64) -> String {
        format!("{}_{}.{}", entity_id, now_millis, extension)
    }

    pub fn upload_url(&self, object_name: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url(),
            urlencoding::encode(&self.config.bucket),
            urlencoding::encode(object_name)
        )
    }

    /// Publicly readable URL of an uploaded object
    pub fn public_url(&self, object_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url(),
            urlencoding::encode(&self.config.bucket),
            urlencoding::encode(object_name)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Profile store request failed");
        Err(ProfileStoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Fetch the avatar URL and last modification time of a profile
    pub async fn fetch_record(&self, entity_id: &str) -> Result<RemoteRecord> {
        let url = self.record_url(entity_id);
        debug!(url = %url, "Fetching profile record");

        let response = self.authorize(self.http.get(&url)).send().await?;
        let body = Self::check(response).await?.text().await?;
        let rows: Vec<ProfileRow> = serde_json::from_str(&body)?;

        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| ProfileStoreError::NotFound(entity_id.to_string()))?;
        Ok(row.into_record())
    }

    /// Patch fields of a profile row
    pub async fn update_record(&self, entity_id: &str, update: &RecordUpdate) -> Result<()> {
        let url = self.row_url(entity_id);
        debug!(url = %url, "Updating profile record");

        let response = self
            .authorize(self.http.patch(&url))
            .header("Prefer", "return=minimal")
            .json(update)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Upload avatar bytes and return the public URL of the new object
    pub async fn upload_avatar(
        &self,
        entity_id: &str,
        data: Vec<u8>,
        extension: &str,
    ) -> Result<String> {
        let name = Self::object_name(entity_id, extension, Utc::now().timestamp_millis());
        let url = self.upload_url(&name);
        debug!(url = %url, size = data.len(), "Uploading avatar");

        let response = self
            .authorize(self.http.post(&url))
            .header(reqwest::header::CONTENT_TYPE, format!("image/{}", extension))
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;
        Self::check(response).await?;

        Ok(self.public_url(&name))
    }
}

#[async_trait]
impl RecordStore for ProfileStoreClient {
    async fn read_record(&self, entity_id: &str) -> avatar_cache::Result<RemoteRecord> {
        Ok(self.fetch_record(entity_id).await?)
    }

    async fn write_record(&self, entity_id: &str, update: &RecordUpdate) -> avatar_cache::Result<()> {
        Ok(self.update_record(entity_id, update).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ProfileStoreClient {
        ProfileStoreClient::new(ProfileStoreConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_record_url() {
        let c = client("https://proj.example.co/");
        assert_eq!(
            c.record_url("u1"),
            "https://proj.example.co/rest/v1/profiles?id=eq.u1&select=avatar_url,updated_at"
        );
    }

    #[test]
    fn test_row_url_encodes_entity() {
        let c = client("https://proj.example.co");
        assert_eq!(
            c.row_url("a b&c"),
            "https://proj.example.co/rest/v1/profiles?id=eq.a%20b%26c"
        );
    }

    #[test]
    fn test_object_urls() {
        let c = client("https://proj.example.co");
        let name = ProfileStoreClient::object_name("u1", "png", 1700);
        assert_eq!(name, "u1_1700.png");
        assert_eq!(
            c.upload_url(&name),
            "https://proj.example.co/storage/v1/object/avatars/u1_1700.png"
        );
        assert_eq!(
            c.public_url(&name),
            "https://proj.example.co/storage/v1/object/public/avatars/u1_1700.png"
        );
    }

    #[tokio::test]
    async fn test_unreachable_store_is_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept connections
        let c = client("http://127.0.0.1:9");
        let err = c.read_record("u1").await.unwrap_err();
        assert!(err.is_transport());
    }
}
