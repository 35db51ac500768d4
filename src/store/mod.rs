//! Local Manifest Store
//!
//! A single append-only table of opaque JSON blobs keyed by an
//! auto-incrementing id. The manifest bootstrapper only ever looks at the
//! first record; nothing here updates or deletes rows.
//!
//! ```text
//! destinydata
//!   id   INTEGER PRIMARY KEY AUTOINCREMENT
//!   data BLOB (JSON bytes)
//! ```

mod error;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use sqlite::{SqliteStore, SCHEMA_VERSION};

use async_trait::async_trait;
use serde_json::Value;

/// One stored blob
#[derive(Debug, Clone, PartialEq)]
pub struct CacheRecord {
    /// Assigned by the store on insert
    pub id: i64,
    pub data: Value,
}

/// Append-only blob storage
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Insert a new record and return its id once the write is durable
    async fn append(&self, data: &Value) -> StoreResult<i64>;

    /// First record in insertion order, if any
    async fn peek_first(&self) -> StoreResult<Option<CacheRecord>>;
}
