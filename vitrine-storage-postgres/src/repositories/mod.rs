//! Repository implementations for PostgreSQL storage

pub mod blog;
pub mod calendar;
pub mod item;
pub mod login_attempt;
mod ordering;

pub use blog::PostgresBlogRepository;
pub use calendar::PostgresCalendarRepository;
pub use item::PostgresItemRepository;
pub use login_attempt::PostgresLoginAttemptRepository;

use async_trait::async_trait;
use sqlx::PgPool;
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

use crate::migrations::{self, PostgresMigrationManager};

/// Repository provider implementation for PostgreSQL
pub struct PostgresRepositoryProvider {
    pool: PgPool,
    login_attempt: Arc<PostgresLoginAttemptRepository>,
    blog: Arc<PostgresBlogRepository>,
    item: Arc<PostgresItemRepository>,
    calendar: Arc<PostgresCalendarRepository>,
}

impl PostgresRepositoryProvider {
    pub fn new(pool: PgPool) -> Self {
        let login_attempt = Arc::new(PostgresLoginAttemptRepository::new(pool.clone()));
        let blog = Arc::new(PostgresBlogRepository::new(pool.clone()));
        let item = Arc::new(PostgresItemRepository::new(pool.clone()));
        let calendar = Arc::new(PostgresCalendarRepository::new(pool.clone()));

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

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl LoginAttemptRepositoryProvider for PostgresRepositoryProvider {
    type LoginAttemptRepo = PostgresLoginAttemptRepository;

    fn login_attempt(&self) -> &Self::LoginAttemptRepo {
        &self.login_attempt
    }
}

impl ContentRepositoryProvider<Blog> for PostgresRepositoryProvider {
    type ContentRepo = PostgresBlogRepository;

    fn content(&self) -> &Self::ContentRepo {
        &self.blog
    }
}

impl ContentRepositoryProvider<Item> for PostgresRepositoryProvider {
    type ContentRepo = PostgresItemRepository;

    fn content(&self) -> &Self::ContentRepo {
        &self.item
    }
}

impl CalendarRepositoryProvider for PostgresRepositoryProvider {
    type CalendarRepo = PostgresCalendarRepository;

    fn calendar(&self) -> &Self::CalendarRepo {
        &self.calendar
    }
}

#[async_trait]
impl RepositoryProvider for PostgresRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        use vitrine_migration::MigrationManager;

        let manager = PostgresMigrationManager::new(self.pool.clone());
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
