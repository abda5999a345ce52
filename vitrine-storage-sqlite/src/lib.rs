//! SQLite storage backend.
//!
//! Timestamps are stored as unix seconds and ids as 16-byte blobs.
//!
//! ```rust,ignore
//! use vitrine_core::{PoolConfig, repositories::RepositoryProvider};
//! use vitrine_storage_sqlite::SqliteRepositoryProvider;
//!
//! let provider = SqliteRepositoryProvider::connect("sqlite://vitrine.db?mode=rwc", &PoolConfig::default()).await?;
//! provider.migrate().await?;
//! ```

pub mod migrations;
pub mod repositories;

pub use repositories::{
    SqliteBlogRepository, SqliteCalendarRepository, SqliteItemRepository,
    SqliteLoginAttemptRepository, SqliteRepositoryProvider,
};

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use vitrine_core::{Error, PoolConfig, error::StorageError};

/// Open a pool sized by `config`.
pub async fn connect(url: &str, config: &PoolConfig) -> Result<SqlitePool, Error> {
    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .acquire_timeout(config.acquire_timeout)
        .connect(url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to SQLite");
            Error::Storage(StorageError::Connection(
                "Failed to connect to SQLite".to_string(),
            ))
        })
}
