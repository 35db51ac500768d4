//! SQLite-backed blob store
//!
//! One table, two columns. The schema version lives in `PRAGMA user_version`
//! so later migrations can tell which layout a file carries.

use crate::store::error::{StoreError, StoreResult};
use crate::store::{BlobStore, CacheRecord};
use async_trait::async_trait;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use tokio::sync::Mutex;

/// Current on-disk schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Blob store persisted in a SQLite file
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    table: String,
    location: String,
}

impl SqliteStore {
    /// Create or open a store file and declare its schema
    pub fn open(path: &Path, table: &str) -> StoreResult<Self> {
        validate_table(table)?;
        let location = path.display().to_string();

        let open_err = |message: String| StoreError::Open {
            path: location.clone(),
            message,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| open_err(e.to_string()))?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| open_err(e.to_string()))?;

        // Appends must be durable before they return
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = FULL;
            ",
        )
        .map_err(|e| open_err(e.to_string()))?;

        Self::with_connection(conn, table, location)
    }

    /// Ephemeral store, gone when dropped
    pub fn open_in_memory(table: &str) -> StoreResult<Self> {
        validate_table(table)?;
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Open {
            path: ":memory:".to_string(),
            message: e.to_string(),
        })?;
        Self::with_connection(conn, table, ":memory:".to_string())
    }

    fn with_connection(conn: Connection, table: &str, location: String) -> StoreResult<Self> {
        declare_schema(&conn, table)?;

        tracing::debug!(path = %location, table, "Store opened");

        Ok(Self {
            conn: Mutex::new(Some(conn)),
            table: table.to_string(),
            location,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// File path, or `:memory:`
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Number of stored records
    pub async fn count(&self) -> StoreResult<u64> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get::<_, i64>(0),
        )
        .map(|n| n as u64)
        .map_err(|e| StoreError::Read(e.to_string()))
    }

    /// Close the connection; later operations fail with [`StoreError::Closed`]
    pub async fn close(&self) -> StoreResult<()> {
        let conn = self.conn.lock().await.take();
        if let Some(conn) = conn {
            conn.close()
                .map_err(|(_, e)| StoreError::Write(e.to_string()))?;
            tracing::debug!(path = %self.location, "Store closed");
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for SqliteStore {
    async fn append(&self, data: &Value) -> StoreResult<i64> {
        let bytes = serde_json::to_vec(data).map_err(|e| StoreError::Write(e.to_string()))?;

        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        conn.execute(
            &format!("INSERT INTO {} (data) VALUES (?1)", self.table),
            params![bytes],
        )
        .map_err(|e| StoreError::Write(e.to_string()))?;

        let id = conn.last_insert_rowid();
        tracing::info!(table = %self.table, id, bytes = bytes.len(), "Appended record");
        Ok(id)
    }

    async fn peek_first(&self) -> StoreResult<Option<CacheRecord>> {
        let guard = self.conn.lock().await;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;

        let row = conn
            .query_row(
                &format!("SELECT id, data FROM {} ORDER BY id ASC LIMIT 1", self.table),
                [],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?)),
            )
            .optional()
            .map_err(|e| StoreError::Read(e.to_string()))?;

        match row {
            None => Ok(None),
            Some((id, bytes)) => {
                let data = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                    id,
                    message: e.to_string(),
                })?;
                Ok(Some(CacheRecord { id, data }))
            }
        }
    }
}

fn declare_schema(conn: &Connection, table: &str) -> StoreResult<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| StoreError::Schema(e.to_string()))?;

    if version > SCHEMA_VERSION {
        return Err(StoreError::Schema(format!(
            "store schema version {} is newer than supported version {}",
            version, SCHEMA_VERSION
        )));
    }

    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                data BLOB NOT NULL
            )",
            table
        ),
        [],
    )
    .map_err(|e| StoreError::Schema(e.to_string()))?;

    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)
            .map_err(|e| StoreError::Schema(e.to_string()))?;
    }

    Ok(())
}

/// Table names are interpolated into SQL, so only plain identifiers pass
fn validate_table(table: &str) -> StoreResult<()> {
    let mut chars = table.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StoreError::Schema(format!("invalid table name '{}'", table)))
    }
}
