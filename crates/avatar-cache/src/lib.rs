//! Local-first avatar cache
//!
//! Keeps one cached file per entity in a local directory, tracks which
//! remote state it reflects in a durable key-value store, and reconciles it
//! against a remote record store. Reads never touch the network; syncs
//! degrade to the last known good copy when the remote is unreachable.

pub mod engine;
pub mod error;
pub mod kv;
pub mod materialize;
pub mod metadata;
pub mod remote;
pub mod transport;
pub mod types;

pub use engine::{needs_download, AvatarCache};
pub use error::{AvatarCacheError, Result};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use materialize::{derive_filename, ensure_directory, Materializer};
pub use metadata::MetadataStore;
pub use remote::RecordStore;
pub use transport::{BlobResponse, BlobTransport, ByteStream, HttpBlobTransport};
pub use types::{
    format_timestamp, parse_timestamp, CacheConfig, CacheEntry, MetadataField, RecordUpdate,
    RemoteRecord, SyncOutcome,
};
