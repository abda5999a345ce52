//! Repository implementations for SQLite storage

pub mod blog;
pub mod calendar;
pub mod item;
pub mod login_attempt;
mod ordering;

pub use blog::SqliteBlogRepository;
pub use calendar::SqliteCalendarRepository;
pub use item::SqliteItemRepository;
pub use login_attempt::SqliteLoginAttemptRepository;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use vitrine_core::{
    Error, PoolConfig,
    error::StorageError,
    repositories::{
        CalendarRepositoryProvider, ContentRepositoryProvider, LoginAttemptRepositoryProvider,
        RepositoryProvider,
    },
    storage::{Blog, Item},
};

use crate::migrations::{self, SqliteMigrationManager};

/// Repository provider implementation for SQLite
///
/// This struct implements all the individual repository provider traits
/// as well as the unified `RepositoryProvider` trait.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    login_attempt: Arc<SqliteLoginAttemptRepository>,
    blog: Arc<SqliteBlogRepository>,
    item: Arc<SqliteItemRepository>,
    calendar: Arc<SqliteCalendarRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let login_attempt = Arc::new(SqliteLoginAttemptRepository::new(pool.clone()));
        let blog = Arc::new(SqliteBlogRepository::new(pool.clone()));
        let item = Arc::new(SqliteItemRepository::new(pool.clone()));
        let calendar = Arc::new(SqliteCalendarRepository::new(pool.clone()));

        Self {
            pool,
            login_attempt,
            blog,
            item,
            calendar,
        }
    }

    pub async fn connect(url: &str, config: &PoolConfig) -> Result<Self, Error> {
        Ok(Self::new(crate::connect(url, config).await?))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl LoginAttemptRepositoryProvider for SqliteRepositoryProvider {
    type LoginAttemptRepo = SqliteLoginAttemptRepository;

    fn login_attempt(&self) -> &Self::LoginAttemptRepo {
        &self.login_attempt
    }
}

impl ContentRepositoryProvider<Blog> for SqliteRepositoryProvider {
    type ContentRepo = SqliteBlogRepository;

    fn content(&self) -> &Self::ContentRepo {
        &self.blog
    }
}

impl ContentRepositoryProvider<Item> for SqliteRepositoryProvider {
    type ContentRepo = SqliteItemRepository;

    fn content(&self) -> &Self::ContentRepo {
        &self.item
    }
}

impl CalendarRepositoryProvider for SqliteRepositoryProvider {
    type CalendarRepo = SqliteCalendarRepository;

    fn calendar(&self) -> &Self::CalendarRepo {
        &self.calendar
    }
}

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        use vitrine_migration::MigrationManager;

        let manager = SqliteMigrationManager::new(self.pool.clone());
        manager.initialize().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to initialize migrations");
            Error::Storage(StorageError::Migration(
                "Failed to initialize migrations".to_string(),
            ))
        })?;

        manager.up(&migrations::all()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })?;

        Ok(())
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;
        Ok(())
    }
}

/// Unix seconds as stored by this backend.
pub(crate) fn from_unix(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use uuid::Uuid;

    pub(crate) async fn setup_test_db() -> SqlitePool {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");

        SqliteRepositoryProvider::new(pool.clone())
            .migrate()
            .await
            .expect("Failed to run migrations");

        pool
    }

    pub(crate) async fn create_test_user(pool: &SqlitePool, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO users (id, email) VALUES (?, ?)")
            .bind(id)
            .bind(email)
            .execute(pool)
            .await
            .expect("Failed to create user");
        id
    }

    #[tokio::test]
    async fn test_provider_health_check() {
        let provider = SqliteRepositoryProvider::new(setup_test_db().await);
        provider.health_check().await.unwrap();
        // Already applied migrations are skipped.
        provider.migrate().await.unwrap();
    }

    #[test]
    fn test_from_unix() {
        assert_eq!(from_unix(0), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(from_unix(1_700_000_000).timestamp(), 1_700_000_000);
    }
}
