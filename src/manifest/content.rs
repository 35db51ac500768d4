//! Cached manifest content
//!
//! The JSON world content is one object per definition table, each keyed by
//! the definition's unsigned 32-bit hash rendered as a string.

use crate::store::CacheRecord;
use serde_json::Value;

/// Read-only view over the cached content blob
#[derive(Debug, Clone)]
pub struct CachedManifest {
    record: CacheRecord,
}

impl CachedManifest {
    pub fn new(record: CacheRecord) -> Self {
        Self { record }
    }

    /// Store id of the underlying record
    pub fn record_id(&self) -> i64 {
        self.record.id
    }

    pub fn content(&self) -> &Value {
        &self.record.data
    }

    /// Definition table names, e.g. `DestinyInventoryItemDefinition`
    pub fn tables(&self) -> Vec<&str> {
        self.record
            .data
            .as_object()
            .map(|tables| tables.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Look up one definition by table and hash
    pub fn definition(&self, table: &str, hash: u32) -> Option<&Value> {
        self.record.data.get(table)?.get(hash.to_string())
    }
}

/// Reinterpret a definition hash as the signed id used by SQLite manifests
pub fn signed_hash(hash: u32) -> i32 {
    hash as i32
}
