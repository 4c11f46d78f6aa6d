//! Storage abstraction traits
//!
//! The core persists three kinds of values, all as opaque strings under fixed keys:
//! the versioned intent record, the session user name, and provider credentials.
//! [`KvStore`] is the only storage surface it needs.
//!
//! # Example
//!
//! ```rust,ignore
//! use acip::db::StoreProvider;
//!
//! // Ephemeral store (tests, `--storage memory`)
//! let store = StoreProvider::Memory.create_store().await?;
//!
//! // File-backed libsql database
//! let store = StoreProvider::SQLite { path: "./data/acip.db".into() }.create_store().await?;
//! ```

use crate::types::Result;
use crate::utils::toml_config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use std::sync::Arc;

/// Store provider configuration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StoreProvider {
    /// In-memory libsql database (ephemeral, lost on restart)
    #[default]
    Memory,
    /// File-based libsql database
    SQLite {
        /// Path to the database file
        path: String,
    },
}

impl StoreProvider {
    pub fn from_config(config: &StorageConfig) -> Self {
        match config.backend {
            StorageBackend::Memory => StoreProvider::Memory,
            StorageBackend::Libsql => StoreProvider::SQLite {
                path: config.path.clone(),
            },
        }
    }

    /// Open the store described by this provider
    pub async fn create_store(&self) -> Result<Arc<dyn KvStore>> {
        match self {
            StoreProvider::Memory => {
                let store = super::turso::LibsqlStore::new_memory().await?;
                Ok(Arc::new(store))
            }
            StoreProvider::SQLite { path } => {
                let store = super::turso::LibsqlStore::new_local(path).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

/// Durable string key-value storage
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// All keys, sorted
    async fn keys(&self) -> Result<Vec<String>>;
}
