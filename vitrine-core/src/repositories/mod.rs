//! Repository traits for the data access layer
//!
//! Services talk to storage only through these traits.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits give access to one repository type
//! - [`RepositoryProvider`] combines all provider traits plus lifecycle methods
//!
//! Ordered content uses a single generic [`ContentRepository`] trait; a backend
//! provides it once per [`Orderable`](crate::storage::Orderable) type through
//! [`ContentRepositoryProvider`].

pub mod adapter;
pub mod calendar;
pub mod content;
pub mod login_attempt;

pub use adapter::{
    CalendarRepositoryAdapter, ContentRepositoryAdapter, LoginAttemptRepositoryAdapter,
};
pub use calendar::CalendarRepository;
pub use content::ContentRepository;
pub use login_attempt::LoginAttemptRepository;

use async_trait::async_trait;

use crate::{
    Error,
    storage::{Blog, Item, Orderable},
};

// ============================================================================
// Individual Repository Provider Traits
// ============================================================================

/// Provider trait for login attempt repository access.
pub trait LoginAttemptRepositoryProvider: Send + Sync + 'static {
    type LoginAttemptRepo: LoginAttemptRepository;

    fn login_attempt(&self) -> &Self::LoginAttemptRepo;
}

/// Provider trait for one ordered content collection.
///
/// Both `Blog` and `Item` are provided by the same backend, so call sites name
/// the entity type: `<R as ContentRepositoryProvider<Blog>>::content(&provider)`.
pub trait ContentRepositoryProvider<T: Orderable>: Send + Sync + 'static {
    type ContentRepo: ContentRepository<T>;

    fn content(&self) -> &Self::ContentRepo;
}

/// Provider trait for calendar repository access.
pub trait CalendarRepositoryProvider: Send + Sync + 'static {
    type CalendarRepo: CalendarRepository;

    fn calendar(&self) -> &Self::CalendarRepo;
}

// ============================================================================
// Unified Repository Provider Trait
// ============================================================================

/// Provider trait that storage backends implement to provide all repositories.
///
/// # Implementing a Custom Storage Backend
///
/// 1. Implement each `*Repository` trait for your backend
/// 2. Implement each `*RepositoryProvider` trait
/// 3. Implement `RepositoryProvider` with `migrate()` and `health_check()`
///
/// ```rust,ignore
/// use vitrine_core::repositories::*;
///
/// struct MyStorage { /* ... */ }
///
/// impl LoginAttemptRepositoryProvider for MyStorage {
///     type LoginAttemptRepo = MyLoginAttemptRepository;
///     fn login_attempt(&self) -> &Self::LoginAttemptRepo { &self.login_attempts }
/// }
///
/// // ... implement the other provider traits ...
///
/// #[async_trait]
/// impl RepositoryProvider for MyStorage {
///     async fn migrate(&self) -> Result<(), Error> { /* ... */ }
///     async fn health_check(&self) -> Result<(), Error> { /* ... */ }
/// }
/// ```
#[async_trait]
pub trait RepositoryProvider:
    LoginAttemptRepositoryProvider
    + ContentRepositoryProvider<Blog>
    + ContentRepositoryProvider<Item>
    + CalendarRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
