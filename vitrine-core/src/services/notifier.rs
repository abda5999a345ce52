//! Reminder delivery.
//!
//! The scheduler hands every due reminder to a [`Notifier`]. Mail transports
//! live outside this crate and plug in behind the trait.

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    Error,
    storage::CalendarEvent,
    time::in_zone,
};

/// What a recipient is told about an upcoming event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderNotice {
    pub event_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Tz>,
    pub remind_at: DateTime<Tz>,
}

impl ReminderNotice {
    pub fn for_event(event: &CalendarEvent, tz: Tz) -> Self {
        Self {
            event_id: event.id,
            title: event.title.clone(),
            description: event.description.clone(),
            starts_at: in_zone(event.start_date, tz),
            remind_at: in_zone(event.reminder_at(), tz),
        }
    }

    pub fn subject(&self) -> String {
        format!("Reminder: {}", self.title)
    }

    pub fn body(&self) -> String {
        let mut body = format!(
            "{} starts at {}.",
            self.title,
            self.starts_at.format("%Y-%m-%d %H:%M %Z")
        );
        if let Some(description) = self.description.as_deref().filter(|d| !d.is_empty()) {
            body.push_str("\n\n");
            body.push_str(description);
        }
        body
    }
}

#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, recipient: &str, notice: &ReminderNotice) -> Result<(), Error>;
}

/// Notifier that writes each reminder to the log.
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, recipient: &str, notice: &ReminderNotice) -> Result<(), Error> {
        tracing::info!(
            recipient = %recipient,
            event_id = %notice.event_id,
            subject = %notice.subject(),
            starts_at = %notice.starts_at.to_rfc3339(),
            "Reminder notification"
        );
        Ok(())
    }
}
