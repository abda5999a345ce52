//! Repository trait for calendar events and their reminders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    Error,
    storage::{CalendarEvent, DueReminder},
};

#[async_trait]
pub trait CalendarRepository: Send + Sync + 'static {
    async fn create(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CalendarEvent>, Error>;

    /// Events of one owner ordered by start date.
    async fn list_by_owner(&self, owner: &Uuid) -> Result<Vec<CalendarEvent>, Error>;

    /// Persist the editable fields of an event. `reminder_sent` is never written here.
    async fn update(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error>;

    async fn delete(&self, id: &Uuid) -> Result<bool, Error>;

    /// Unsent, opted-in reminders whose instant (`start - offset`) is at or before `until`,
    /// joined with the owner's email.
    async fn due_reminders(&self, until: DateTime<Utc>) -> Result<Vec<DueReminder>, Error>;

    /// Flip `reminder_sent` from false to true. Returns `false` if it was already set
    /// or the event no longer exists.
    async fn mark_reminder_sent(&self, id: &Uuid) -> Result<bool, Error>;
}
