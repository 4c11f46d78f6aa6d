//! Durable session state.
//!
//! The intent record, the session user name and stored provider credentials all live
//! in a small key-value table on a local libsql (SQLite) database:
//! - [`KvStore`] - the storage trait the rest of the crate depends on
//! - [`LibsqlStore`] - file-backed or in-memory libsql implementation
//! - [`StoreProvider`] - picks the backend from `[storage]` configuration

pub mod traits;
pub mod turso;

pub use traits::{KvStore, StoreProvider};
pub use turso::LibsqlStore;
