//! SQLite implementation of the calendar repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;
use vitrine_core::{
    Error,
    error::StorageError,
    repositories::CalendarRepository,
    storage::{CalendarEvent, DueReminder},
};

use super::from_unix;

const COLUMNS: &str = "id, title, description, start_date, end_date, reminder_offset, all_day, color, working_day, sick_day, vacation, weekend, send_email, reminder_sent, user_id, created_at, updated_at";

pub struct SqliteCalendarRepository {
    pool: SqlitePool,
}

impl SqliteCalendarRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteCalendarEvent {
    id: Uuid,
    title: String,
    description: Option<String>,
    start_date: i64,
    end_date: i64,
    reminder_offset: i32,
    all_day: bool,
    color: Option<String>,
    working_day: bool,
    sick_day: bool,
    vacation: bool,
    weekend: bool,
    send_email: bool,
    reminder_sent: bool,
    user_id: Uuid,
    created_at: i64,
    updated_at: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteDueReminder {
    #[sqlx(flatten)]
    event: SqliteCalendarEvent,
    recipient: Option<String>,
}

impl From<SqliteCalendarEvent> for CalendarEvent {
    fn from(row: SqliteCalendarEvent) -> Self {
        CalendarEvent {
            id: row.id,
            title: row.title,
            description: row.description,
            start_date: from_unix(row.start_date),
            end_date: from_unix(row.end_date),
            reminder_offset: row.reminder_offset,
            all_day: row.all_day,
            color: row.color,
            working_day: row.working_day,
            sick_day: row.sick_day,
            vacation: row.vacation,
            weekend: row.weekend,
            send_email: row.send_email,
            reminder_sent: row.reminder_sent,
            user_id: row.user_id,
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        }
    }
}

impl From<SqliteDueReminder> for DueReminder {
    fn from(row: SqliteDueReminder) -> Self {
        DueReminder {
            event: row.event.into(),
            recipient: row.recipient,
        }
    }
}

#[async_trait]
impl CalendarRepository for SqliteCalendarRepository {
    async fn create(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error> {
        let row = sqlx::query_as::<_, SqliteCalendarEvent>(&format!(
            r#"
            INSERT INTO calendar_events ({COLUMNS})
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date.timestamp())
        .bind(event.end_date.timestamp())
        .bind(event.reminder_offset)
        .bind(event.all_day)
        .bind(&event.color)
        .bind(event.working_day)
        .bind(event.sick_day)
        .bind(event.vacation)
        .bind(event.weekend)
        .bind(event.send_email)
        .bind(event.reminder_sent)
        .bind(event.user_id)
        .bind(event.created_at.timestamp())
        .bind(event.updated_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create calendar event");
            StorageError::Database("Failed to create calendar event".to_string())
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CalendarEvent>, Error> {
        let row = sqlx::query_as::<_, SqliteCalendarEvent>(&format!(
            "SELECT {COLUMNS} FROM calendar_events WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get calendar event");
            StorageError::Database("Failed to get calendar event".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn list_by_owner(&self, owner: &Uuid) -> Result<Vec<CalendarEvent>, Error> {
        let rows = sqlx::query_as::<_, SqliteCalendarEvent>(&format!(
            "SELECT {COLUMNS} FROM calendar_events WHERE user_id = ? ORDER BY start_date ASC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list calendar events");
            StorageError::Database("Failed to list calendar events".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error> {
        let row = sqlx::query_as::<_, SqliteCalendarEvent>(&format!(
            r#"
            UPDATE calendar_events
            SET title = ?, description = ?, start_date = ?, end_date = ?, reminder_offset = ?,
                all_day = ?, color = ?, working_day = ?, sick_day = ?, vacation = ?,
                weekend = ?, send_email = ?, updated_at = ?
            WHERE id = ?
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date.timestamp())
        .bind(event.end_date.timestamp())
        .bind(event.reminder_offset)
        .bind(event.all_day)
        .bind(&event.color)
        .bind(event.working_day)
        .bind(event.sick_day)
        .bind(event.vacation)
        .bind(event.weekend)
        .bind(event.send_email)
        .bind(event.updated_at.timestamp())
        .bind(event.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update calendar event");
            StorageError::Database("Failed to update calendar event".to_string())
        })?
        .ok_or(StorageError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete calendar event");
                StorageError::Database("Failed to delete calendar event".to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn due_reminders(&self, until: DateTime<Utc>) -> Result<Vec<DueReminder>, Error> {
        let rows = sqlx::query_as::<_, SqliteDueReminder>(
            r#"
            SELECT e.id, e.title, e.description, e.start_date, e.end_date, e.reminder_offset,
                   e.all_day, e.color, e.working_day, e.sick_day, e.vacation, e.weekend,
                   e.send_email, e.reminder_sent, e.user_id, e.created_at, e.updated_at,
                   u.email AS recipient
            FROM calendar_events e
            LEFT JOIN users u ON u.id = e.user_id
            WHERE e.reminder_sent = 0
              AND e.send_email = 1
              AND e.start_date - e.reminder_offset * 60 <= ?
            ORDER BY e.start_date - e.reminder_offset * 60 ASC
            "#,
        )
        .bind(until.timestamp())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to query due reminders");
            StorageError::Database("Failed to query due reminders".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_reminder_sent(&self, id: &Uuid) -> Result<bool, Error> {
        let result = sqlx::query(
            "UPDATE calendar_events SET reminder_sent = 1, updated_at = ? WHERE id = ? AND reminder_sent = 0",
        )
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to mark reminder as sent");
            StorageError::Database("Failed to mark reminder as sent".to_string())
        })?;

        Ok(result.rows_affected() > 0)
    }
}
