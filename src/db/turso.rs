use crate::db::traits::KvStore;
use crate::types::{AppError, Result};
use async_trait::async_trait;
use chrono::Utc;
use libsql::{Builder, Connection, Database};
use std::path::Path;

/// Key-value store on a local libsql (SQLite) database
pub struct LibsqlStore {
    _db: Database,
    // One shared connection: every `connect()` on an in-memory database opens a
    // separate, empty database.
    conn: Connection,
}

impl LibsqlStore {
    /// Open (or create) a database file, creating its parent directory if needed
    pub async fn new_local(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Storage(format!("Failed to create {}: {}", parent.display(), e))
                })?;
            }
        }

        let db = Builder::new_local(path)
            .build()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to open database: {}", e)))?;

        Self::from_database(db).await
    }

    pub async fn new_memory() -> Result<Self> {
        Self::new_local(":memory:").await
    }

    async fn from_database(db: Database) -> Result<Self> {
        let conn = db
            .connect()
            .map_err(|e| AppError::Storage(format!("Failed to get connection: {}", e)))?;

        let store = Self { _db: db, conn };
        store.initialize_schema().await?;
        Ok(store)
    }

    async fn initialize_schema(&self) -> Result<()> {
        self.conn
            .execute(
                "CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )",
                (),
            )
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create kv_store table: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl KvStore for LibsqlStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await
            .map_err(|e| AppError::Storage(format!("Failed to query key: {}", e)))?;

        if let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?
        {
            Ok(Some(
                row.get::<String>(0)
                    .map_err(|e| AppError::Storage(e.to_string()))?,
            ))
        } else {
            Ok(None)
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().timestamp();

        self.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                (key, value, now),
            )
            .await
            .map_err(|e| AppError::Storage(format!("Failed to store key: {}", e)))?;

        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key = ?", [key])
            .await
            .map_err(|e| AppError::Storage(format!("Failed to remove key: {}", e)))?;

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut rows = self
            .conn
            .query("SELECT key FROM kv_store ORDER BY key", ())
            .await
            .map_err(|e| AppError::Storage(format!("Failed to list keys: {}", e)))?;

        let mut keys = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?
        {
            keys.push(
                row.get::<String>(0)
                    .map_err(|e| AppError::Storage(e.to_string()))?,
            );
        }

        Ok(keys)
    }
}
