use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::{in_zone, reminder_instant, to_utc};

/// A stored calendar event. All instants are UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Minutes before `start_date` at which the reminder is due.
    pub reminder_offset: i32,
    pub all_day: bool,
    pub color: Option<String>,
    pub working_day: bool,
    pub sick_day: bool,
    pub vacation: bool,
    pub weekend: bool,
    pub send_email: bool,
    /// Flips to `true` once, after the reminder was delivered.
    pub reminder_sent: bool,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn from_new(owner: Uuid, event: NewCalendarEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: event.title,
            description: event.description,
            start_date: to_utc(&event.start_date),
            end_date: to_utc(&event.end_date),
            reminder_offset: event.reminder_offset,
            all_day: event.all_day,
            color: event.color,
            working_day: event.working_day,
            sick_day: event.sick_day,
            vacation: event.vacation,
            weekend: event.weekend,
            send_email: event.send_email,
            reminder_sent: false,
            user_id: owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// The instant the reminder becomes due.
    pub fn reminder_at(&self) -> DateTime<Utc> {
        reminder_instant(self.start_date, self.reminder_offset)
    }

    /// Whether the scheduler still has to deliver a reminder for this event.
    pub fn wants_reminder(&self) -> bool {
        self.send_email && !self.reminder_sent
    }
}

/// Client input for a new event. Timestamps may carry any offset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCalendarEvent {
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub reminder_offset: i32,
    #[serde(default)]
    pub all_day: bool,
    pub color: Option<String>,
    #[serde(default)]
    pub working_day: bool,
    #[serde(default)]
    pub sick_day: bool,
    #[serde(default)]
    pub vacation: bool,
    #[serde(default)]
    pub weekend: bool,
    #[serde(default)]
    pub send_email: bool,
}

/// Partial update of an event. `reminder_sent` is owned by the scheduler and
/// cannot be changed here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarEventUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<FixedOffset>>,
    pub end_date: Option<DateTime<FixedOffset>>,
    pub reminder_offset: Option<i32>,
    pub all_day: Option<bool>,
    pub color: Option<String>,
    pub working_day: Option<bool>,
    pub sick_day: Option<bool>,
    pub vacation: Option<bool>,
    pub weekend: Option<bool>,
    pub send_email: Option<bool>,
}

impl CalendarEventUpdate {
    pub fn apply_to(self, event: &mut CalendarEvent) {
        if let Some(title) = self.title {
            event.title = title;
        }
        if let Some(description) = self.description {
            event.description = Some(description);
        }
        if let Some(start) = self.start_date {
            event.start_date = to_utc(&start);
        }
        if let Some(end) = self.end_date {
            event.end_date = to_utc(&end);
        }
        if let Some(offset) = self.reminder_offset {
            event.reminder_offset = offset;
        }
        if let Some(all_day) = self.all_day {
            event.all_day = all_day;
        }
        if let Some(color) = self.color {
            event.color = Some(color);
        }
        if let Some(working_day) = self.working_day {
            event.working_day = working_day;
        }
        if let Some(sick_day) = self.sick_day {
            event.sick_day = sick_day;
        }
        if let Some(vacation) = self.vacation {
            event.vacation = vacation;
        }
        if let Some(weekend) = self.weekend {
            event.weekend = weekend;
        }
        if let Some(send_email) = self.send_email {
            event.send_email = send_email;
        }
    }
}

/// An event as shown to users, with every instant in the display zone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarEventView {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_date: DateTime<Tz>,
    pub end_date: DateTime<Tz>,
    pub reminder_offset: i32,
    pub reminder_at: DateTime<Tz>,
    pub all_day: bool,
    pub color: Option<String>,
    pub working_day: bool,
    pub sick_day: bool,
    pub vacation: bool,
    pub weekend: bool,
    pub send_email: bool,
    pub reminder_sent: bool,
    pub user_id: Uuid,
}

impl CalendarEventView {
    pub fn new(event: CalendarEvent, tz: Tz) -> Self {
        let reminder_at = in_zone(event.reminder_at(), tz);
        Self {
            id: event.id,
            title: event.title,
            description: event.description,
            start_date: in_zone(event.start_date, tz),
            end_date: in_zone(event.end_date, tz),
            reminder_offset: event.reminder_offset,
            reminder_at,
            all_day: event.all_day,
            color: event.color,
            working_day: event.working_day,
            sick_day: event.sick_day,
            vacation: event.vacation,
            weekend: event.weekend,
            send_email: event.send_email,
            reminder_sent: event.reminder_sent,
            user_id: event.user_id,
        }
    }
}

/// An unsent reminder returned by the due query, with the owner's address.
#[derive(Debug, Clone, PartialEq)]
pub struct DueReminder {
    pub event: CalendarEvent,
    pub recipient: Option<String>,
}
