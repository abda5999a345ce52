//! # Vitrine
//!
//! Vitrine is the back office of a multilingual storefront. It keeps blog posts
//! and catalogue items in a stable per-language order, protects the login route
//! against credential guessing, and delivers calendar reminders by email.
//!
//! ## Storage Support
//!
//! - SQLite (`sqlite` feature, on by default)
//! - Postgres (`postgres` feature)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitrine::{Vitrine, SqliteRepositoryProvider};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
//!     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
//!
//!     let vitrine = Vitrine::new(repositories);
//!     vitrine.migrate().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;

use std::sync::Arc;

use vitrine_core::{
    repositories::{
        CalendarRepositoryAdapter, ContentRepositoryAdapter, LoginAttemptRepositoryAdapter,
        RepositoryProvider,
    },
    services::{CalendarService, ContentService, LoginGuardService, ReminderScheduler},
};

pub use builder::{NoStorage, VitrineBuilder, VitrineBuilderError, WithStorage};
pub use config::{AppConfig, Backend, ConfigError};

/// Re-export core types from vitrine_core
pub use vitrine_core::{
    Blog, CalendarEvent, CalendarEventView, Error, ErrorKind, Item, LockoutStatus, LockoutTier,
    LoginGuardConfig, PoolConfig, SchedulerConfig, TenantId,
    services::{Notifier, PollReport, ReminderNotice, TracingNotifier},
    storage::{
        BlogPatch, CalendarEventUpdate, ItemPatch, ListQuery, NewBlog, NewCalendarEvent, NewItem,
    },
};

#[cfg(feature = "sqlite")]
pub use vitrine_storage_sqlite::SqliteRepositoryProvider;

#[cfg(feature = "postgres")]
pub use vitrine_storage_postgres::PostgresRepositoryProvider;

/// Blog service wired to a provider.
pub type BlogService<R> = ContentService<Blog, ContentRepositoryAdapter<R, Blog>>;
/// Catalogue item service wired to a provider.
pub type ItemService<R> = ContentService<Item, ContentRepositoryAdapter<R, Item>>;
/// Reminder scheduler wired to a provider.
pub type Scheduler<R, N> = ReminderScheduler<CalendarRepositoryAdapter<R>, N>;

/// Errors raised by the facade itself.
#[derive(Debug, thiserror::Error)]
pub enum VitrineError {
    /// Error when interacting with storage
    #[error("Storage error: {0}")]
    StorageError(String),
}

/// Coordinates the services of one tenant over one repository provider.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use vitrine::{ListQuery, SqliteRepositoryProvider, Vitrine};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = sqlx::SqlitePool::connect("sqlite::memory:").await?;
/// let vitrine = Vitrine::new(Arc::new(SqliteRepositoryProvider::new(pool)));
///
/// let posts = vitrine.blogs().list(&ListQuery::language("pl")).await?;
/// # Ok(())
/// # }
/// ```
pub struct Vitrine<R: RepositoryProvider> {
    repositories: Arc<R>,
    tenant: TenantId,
    login_guard: Arc<LoginGuardService<LoginAttemptRepositoryAdapter<R>>>,
    blogs: Arc<BlogService<R>>,
    items: Arc<ItemService<R>>,
    calendar: Arc<CalendarService<CalendarRepositoryAdapter<R>>>,
    calendar_repo: Arc<CalendarRepositoryAdapter<R>>,
    scheduler_config: SchedulerConfig,
}

impl<R: RepositoryProvider> Vitrine<R> {
    /// Create an instance for the default tenant with default configuration.
    pub fn new(repositories: Arc<R>) -> Self {
        Self::from_parts(
            repositories,
            TenantId::default_tenant(),
            LoginGuardConfig::default(),
            SchedulerConfig::default(),
        )
    }

    pub(crate) fn from_parts(
        repositories: Arc<R>,
        tenant: TenantId,
        login_guard_config: LoginGuardConfig,
        scheduler_config: SchedulerConfig,
    ) -> Self {
        let login_attempts = Arc::new(LoginAttemptRepositoryAdapter::new(repositories.clone()));
        let calendar_repo = Arc::new(CalendarRepositoryAdapter::new(repositories.clone()));

        Self {
            login_guard: Arc::new(LoginGuardService::new(login_attempts, login_guard_config)),
            blogs: Arc::new(ContentService::new(Arc::new(ContentRepositoryAdapter::new(
                repositories.clone(),
            )))),
            items: Arc::new(ContentService::new(Arc::new(ContentRepositoryAdapter::new(
                repositories.clone(),
            )))),
            calendar: Arc::new(
                CalendarService::new(calendar_repo.clone())
                    .with_timezone(scheduler_config.timezone),
            ),
            calendar_repo,
            repositories,
            tenant,
            scheduler_config,
        }
    }

    /// Run migrations for all repositories
    pub async fn migrate(&self) -> Result<(), VitrineError> {
        self.repositories
            .migrate()
            .await
            .map_err(|e| VitrineError::StorageError(e.to_string()))
    }

    /// Health check for all repositories
    pub async fn health_check(&self) -> Result<(), VitrineError> {
        self.repositories
            .health_check()
            .await
            .map_err(|e| VitrineError::StorageError(e.to_string()))
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub fn repositories(&self) -> &Arc<R> {
        &self.repositories
    }

    /// Guard consulted around every login attempt.
    pub fn login_guard(&self) -> Arc<LoginGuardService<LoginAttemptRepositoryAdapter<R>>> {
        self.login_guard.clone()
    }

    pub fn blogs(&self) -> &BlogService<R> {
        &self.blogs
    }

    pub fn items(&self) -> &ItemService<R> {
        &self.items
    }

    pub fn calendar(&self) -> &CalendarService<CalendarRepositoryAdapter<R>> {
        &self.calendar
    }

    pub fn scheduler_config(&self) -> &SchedulerConfig {
        &self.scheduler_config
    }

    /// Build this tenant's reminder scheduler. Call
    /// [`start`](ReminderScheduler::start) on the result to run it.
    pub fn reminder_scheduler<N: Notifier>(&self, notifier: Arc<N>) -> Scheduler<R, N> {
        ReminderScheduler::new(
            self.tenant.clone(),
            self.calendar_repo.clone(),
            notifier,
            self.scheduler_config.clone(),
        )
    }
}
