//! Client for the remote profile store
//!
//! Reads and patches profile rows through a PostgREST-style REST API and
//! uploads avatar objects to the accompanying object storage. Implements
//! [`avatar_cache::RecordStore`] so it can back an
//! [`avatar_cache::AvatarCache`].
//!
//! # Endpoints
//!
//! - `GET /rest/v1/{table}?id=eq.{id}&select=avatar_url,updated_at`
//! - `PATCH /rest/v1/{table}?id=eq.{id}`
//! - `POST /storage/v1/object/{bucket}/{name}`
//! - public objects under `/storage/v1/object/public/{bucket}/{name}`

mod client;
mod error;
mod types;

pub use client::ProfileStoreClient;
pub use error::{ProfileStoreError, Result};
pub use types::{parse_updated_at, ProfileRow, ProfileStoreConfig};
