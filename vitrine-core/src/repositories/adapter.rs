use std::{marker::PhantomData, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Error,
    repositories::{
        CalendarRepository, CalendarRepositoryProvider, ContentRepository,
        ContentRepositoryProvider, LoginAttemptRepository, LoginAttemptRepositoryProvider,
    },
    storage::{CalendarEvent, DueReminder, ListQuery, LoginAttempt, Orderable},
};

/// Adapter that wraps a provider and implements [`LoginAttemptRepository`]
pub struct LoginAttemptRepositoryAdapter<R: LoginAttemptRepositoryProvider> {
    provider: Arc<R>,
}

impl<R: LoginAttemptRepositoryProvider> LoginAttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: LoginAttemptRepositoryProvider> LoginAttemptRepository
    for LoginAttemptRepositoryAdapter<R>
{
    async fn find(&self, email: &str, ip: &str) -> Result<Option<LoginAttempt>, Error> {
        self.provider.login_attempt().find(email, ip).await
    }

    async fn save(&self, attempt: &LoginAttempt) -> Result<LoginAttempt, Error> {
        self.provider.login_attempt().save(attempt).await
    }

    async fn delete(&self, email: &str, ip: &str) -> Result<u64, Error> {
        self.provider.login_attempt().delete(email, ip).await
    }
}

/// Adapter that wraps a provider and implements [`ContentRepository`] for one entity type
pub struct ContentRepositoryAdapter<R: ContentRepositoryProvider<T>, T: Orderable> {
    provider: Arc<R>,
    _entity: PhantomData<fn() -> T>,
}

impl<R: ContentRepositoryProvider<T>, T: Orderable> ContentRepositoryAdapter<R, T> {
    pub fn new(provider: Arc<R>) -> Self {
        Self {
            provider,
            _entity: PhantomData,
        }
    }

    fn repo(&self) -> &R::ContentRepo {
        <R as ContentRepositoryProvider<T>>::content(&self.provider)
    }
}

#[async_trait]
impl<R: ContentRepositoryProvider<T>, T: Orderable> ContentRepository<T>
    for ContentRepositoryAdapter<R, T>
{
    async fn create(&self, draft: &T::Draft) -> Result<T, Error> {
        self.repo().create(draft).await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<T>, Error> {
        self.repo().find_by_id(id).await
    }

    async fn update(&self, entity: &T) -> Result<T, Error> {
        self.repo().update(entity).await
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
        self.repo().delete(id).await
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<T>, Error> {
        self.repo().list(query).await
    }

    async fn find_at_position(&self, partition: &str, position: i32) -> Result<Option<T>, Error> {
        self.repo().find_at_position(partition, position).await
    }

    async fn list_from_position(&self, partition: &str, position: i32) -> Result<Vec<T>, Error> {
        self.repo().list_from_position(partition, position).await
    }

    async fn save_position(&self, id: &Uuid, position: i32) -> Result<(), Error> {
        self.repo().save_position(id, position).await
    }
}

/// Adapter that wraps a provider and implements [`CalendarRepository`]
pub struct CalendarRepositoryAdapter<R: CalendarRepositoryProvider> {
    provider: Arc<R>,
}

impl<R: CalendarRepositoryProvider> CalendarRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: CalendarRepositoryProvider> CalendarRepository for CalendarRepositoryAdapter<R> {
    async fn create(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error> {
        self.provider.calendar().create(event).await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CalendarEvent>, Error> {
        self.provider.calendar().find_by_id(id).await
    }

    async fn list_by_owner(&self, owner: &Uuid) -> Result<Vec<CalendarEvent>, Error> {
        self.provider.calendar().list_by_owner(owner).await
    }

    async fn update(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error> {
        self.provider.calendar().update(event).await
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
        self.provider.calendar().delete(id).await
    }

    async fn due_reminders(&self, until: DateTime<Utc>) -> Result<Vec<DueReminder>, Error> {
        self.provider.calendar().due_reminders(until).await
    }

    async fn mark_reminder_sent(&self, id: &Uuid) -> Result<bool, Error> {
        self.provider.calendar().mark_reminder_sent(id).await
    }
}
