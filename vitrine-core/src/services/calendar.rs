//! Calendar events owned by a single user.
//!
//! Client timestamps may arrive in any zone. They are stored in UTC and every
//! event handed back is rendered in the configured display zone.

use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use uuid::Uuid;

use crate::{
    Error,
    error::{
        AuthError, StorageError, ValidationError,
        utilities::{FoundExt, require_text},
    },
    repositories::CalendarRepository,
    storage::{CalendarEvent, CalendarEventUpdate, CalendarEventView, NewCalendarEvent},
    time::DISPLAY_TZ,
};

pub struct CalendarService<R: CalendarRepository> {
    repository: Arc<R>,
    timezone: Tz,
}

impl<R: CalendarRepository> CalendarService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            timezone: DISPLAY_TZ,
        }
    }

    pub fn with_timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub async fn create(
        &self,
        owner: Uuid,
        event: NewCalendarEvent,
    ) -> Result<CalendarEventView, Error> {
        let event = CalendarEvent::from_new(owner, event, Utc::now());
        validate(&event)?;

        let created = self.repository.create(&event).await?;
        tracing::debug!(id = %created.id, owner = %owner, "Created calendar event");

        Ok(self.view(created))
    }

    pub async fn get(&self, actor: Uuid, id: &Uuid) -> Result<CalendarEventView, Error> {
        let event = self.owned(actor, id).await?;
        Ok(self.view(event))
    }

    pub async fn list(&self, owner: Uuid) -> Result<Vec<CalendarEventView>, Error> {
        let events = self.repository.list_by_owner(&owner).await?;
        Ok(events.into_iter().map(|e| self.view(e)).collect())
    }

    /// Apply a partial update. The reminder-sent flag is left as stored.
    pub async fn update(
        &self,
        actor: Uuid,
        id: &Uuid,
        changes: CalendarEventUpdate,
    ) -> Result<CalendarEventView, Error> {
        let mut event = self.owned(actor, id).await?;
        changes.apply_to(&mut event);
        event.updated_at = Utc::now();
        validate(&event)?;

        let updated = self.repository.update(&event).await?;
        Ok(self.view(updated))
    }

    pub async fn delete(&self, actor: Uuid, id: &Uuid) -> Result<(), Error> {
        self.owned(actor, id).await?;

        if !self.repository.delete(id).await? {
            return Err(StorageError::NotFound.into());
        }

        Ok(())
    }

    async fn owned(&self, actor: Uuid, id: &Uuid) -> Result<CalendarEvent, Error> {
        let event = self.repository.find_by_id(id).await.found()?;
        if event.user_id != actor {
            return Err(AuthError::NotOwner(format!("calendar event {id}")).into());
        }
        Ok(event)
    }

    fn view(&self, event: CalendarEvent) -> CalendarEventView {
        CalendarEventView::new(event, self.timezone)
    }
}

fn validate(event: &CalendarEvent) -> Result<(), ValidationError> {
    require_text(&event.title, "title")?;

    if event.start_date > event.end_date {
        return Err(ValidationError::InvalidDateRange {
            start: event.start_date,
            end: event.end_date,
        });
    }

    if event.reminder_offset < 0 {
        return Err(ValidationError::InvalidField(
            "reminder_offset cannot be negative".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::DueReminder;
    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset};
    use std::sync::Mutex;

    /// In-memory calendar store shared by the calendar and scheduler tests.
    #[derive(Default)]
    pub(crate) struct MockCalendarRepository {
        pub(crate) events: Mutex<Vec<CalendarEvent>>,
        pub(crate) emails: Mutex<Vec<(Uuid, String)>>,
        pub(crate) fail_due: Mutex<bool>,
    }

    impl MockCalendarRepository {
        pub(crate) fn event(&self, id: Uuid) -> CalendarEvent {
            self.events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == id)
                .cloned()
                .unwrap()
        }
    }

    #[async_trait]
    impl CalendarRepository for MockCalendarRepository {
        async fn create(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error> {
            self.events.lock().unwrap().push(event.clone());
            Ok(event.clone())
        }

        async fn find_by_id(&self, id: &Uuid) -> Result<Option<CalendarEvent>, Error> {
            Ok(self.events.lock().unwrap().iter().find(|e| e.id == *id).cloned())
        }

        async fn list_by_owner(&self, owner: &Uuid) -> Result<Vec<CalendarEvent>, Error> {
            let mut events: Vec<CalendarEvent> = self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.user_id == *owner)
                .cloned()
                .collect();
            events.sort_by_key(|e| e.start_date);
            Ok(events)
        }

        async fn update(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error> {
            let mut events = self.events.lock().unwrap();
            let slot = events
                .iter_mut()
                .find(|e| e.id == event.id)
                .ok_or(StorageError::NotFound)?;
            let reminder_sent = slot.reminder_sent;
            *slot = event.clone();
            slot.reminder_sent = reminder_sent;
            Ok(slot.clone())
        }

        async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
            let mut events = self.events.lock().unwrap();
            let before_len = events.len();
            events.retain(|e| e.id != *id);
            Ok(events.len() < before_len)
        }

        async fn due_reminders(
            &self,
            until: chrono::DateTime<Utc>,
        ) -> Result<Vec<DueReminder>, Error> {
            if *self.fail_due.lock().unwrap() {
                return Err(StorageError::Database("connection reset".to_string()).into());
            }
            let emails = self.emails.lock().unwrap();
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.wants_reminder() && e.reminder_at() <= until)
                .map(|e| DueReminder {
                    event: e.clone(),
                    recipient: emails
                        .iter()
                        .find(|(id, _)| *id == e.user_id)
                        .map(|(_, email)| email.clone()),
                })
                .collect())
        }

        async fn mark_reminder_sent(&self, id: &Uuid) -> Result<bool, Error> {
            let mut events = self.events.lock().unwrap();
            match events.iter_mut().find(|e| e.id == *id) {
                Some(event) if !event.reminder_sent => {
                    event.reminder_sent = true;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }
    }

    fn at(value: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(value).unwrap()
    }

    fn new_event(start: &str, end: &str) -> NewCalendarEvent {
        NewCalendarEvent {
            title: "Inventory".to_string(),
            description: None,
            start_date: at(start),
            end_date: at(end),
            reminder_offset: 30,
            all_day: false,
            color: Some("#ff0000".to_string()),
            working_day: true,
            sick_day: false,
            vacation: false,
            weekend: false,
            send_email: true,
        }
    }

    fn service() -> (
        Arc<MockCalendarRepository>,
        CalendarService<MockCalendarRepository>,
    ) {
        let repo = Arc::new(MockCalendarRepository::default());
        (repo.clone(), CalendarService::new(repo))
    }

    #[tokio::test]
    async fn test_create_renders_in_display_zone() {
        let (repo, service) = service();
        let owner = Uuid::new_v4();

        let view = service
            .create(
                owner,
                new_event("2025-03-10T18:00:00+09:00", "2025-03-10T20:00:00+09:00"),
            )
            .await
            .unwrap();

        assert_eq!(view.start_date.to_rfc3339(), "2025-03-10T10:00:00+01:00");
        assert_eq!(view.end_date.to_rfc3339(), "2025-03-10T12:00:00+01:00");
        assert!(!view.reminder_sent);

        let stored = repo.event(view.id);
        assert_eq!(stored.start_date.to_rfc3339(), "2025-03-10T09:00:00+00:00");

        let fetched = service.get(owner, &view.id).await.unwrap();
        assert_eq!(fetched.start_date, view.start_date);
    }

    #[tokio::test]
    async fn test_create_validates() {
        let (_, service) = service();
        let owner = Uuid::new_v4();

        let err = service
            .create(
                owner,
                new_event("2025-03-10T12:00:00Z", "2025-03-10T11:00:00Z"),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::InvalidDateRange { .. })
        ));

        let mut negative = new_event("2025-03-10T10:00:00Z", "2025-03-10T11:00:00Z");
        negative.reminder_offset = -5;
        assert!(service.create(owner, negative).await.is_err());

        let mut untitled = new_event("2025-03-10T10:00:00Z", "2025-03-10T11:00:00Z");
        untitled.title = String::new();
        assert!(service.create(owner, untitled).await.is_err());
    }

    #[tokio::test]
    async fn test_update_in_other_zone_stays_consistent() {
        let (_, service) = service();
        let owner = Uuid::new_v4();
        let view = service
            .create(
                owner,
                new_event("2025-06-01T08:00:00Z", "2025-06-01T09:00:00Z"),
            )
            .await
            .unwrap();

        let updated = service
            .update(
                owner,
                &view.id,
                CalendarEventUpdate {
                    start_date: Some(at("2025-06-01T04:30:00-04:00")),
                    end_date: Some(at("2025-06-01T05:30:00-04:00")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.start_date.to_rfc3339(), "2025-06-01T10:30:00+02:00");
        assert_eq!(updated.title, "Inventory");
    }

    #[tokio::test]
    async fn test_update_cannot_invert_range() {
        let (_, service) = service();
        let owner = Uuid::new_v4();
        let view = service
            .create(
                owner,
                new_event("2025-06-01T08:00:00Z", "2025-06-01T09:00:00Z"),
            )
            .await
            .unwrap();

        let err = service
            .update(
                owner,
                &view.id,
                CalendarEventUpdate {
                    end_date: Some(at("2025-06-01T07:00:00Z")),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_validation_error());
    }

    #[tokio::test]
    async fn test_foreign_owner_rejected() {
        let (_, service) = service();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let view = service
            .create(
                owner,
                new_event("2025-06-01T08:00:00Z", "2025-06-01T09:00:00Z"),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.get(stranger, &view.id).await.unwrap_err(),
            Error::Auth(AuthError::NotOwner(_))
        ));
        assert!(service.delete(stranger, &view.id).await.is_err());
        assert!(service.list(stranger).await.unwrap().is_empty());

        service.delete(owner, &view.id).await.unwrap();
        assert!(service.get(owner, &view.id).await.unwrap_err().is_not_found());
    }
}
