//! Remote record store seam

use crate::error::Result;
use crate::types::{RecordUpdate, RemoteRecord};
use async_trait::async_trait;

/// Source of truth for which asset an entity currently has
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fails with `NotFound` when the entity has no record, or a transport
    /// error when the store cannot be reached.
    async fn read_record(&self, entity_id: &str) -> Result<RemoteRecord>;

    /// Update fields of the entity's record. The cache engine never calls
    /// this; it completes the upload flow for callers.
    async fn write_record(&self, entity_id: &str, update: &RecordUpdate) -> Result<()>;
}
