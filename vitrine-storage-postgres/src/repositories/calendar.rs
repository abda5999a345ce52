//! PostgreSQL implementation of the calendar repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vitrine_core::{
    Error,
    error::StorageError,
    repositories::CalendarRepository,
    storage::{CalendarEvent, DueReminder},
};

const COLUMNS: &str = "id, title, description, start_date, end_date, reminder_offset, all_day, color, working_day, sick_day, vacation, weekend, send_email, reminder_sent, user_id, created_at, updated_at";

pub struct PostgresCalendarRepository {
    pool: PgPool,
}

impl PostgresCalendarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PgCalendarEvent {
    id: Uuid,
    title: String,
    description: Option<String>,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
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
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct PgDueReminder {
    #[sqlx(flatten)]
    event: PgCalendarEvent,
    recipient: Option<String>,
}

impl From<PgCalendarEvent> for CalendarEvent {
    fn from(row: PgCalendarEvent) -> Self {
        CalendarEvent {
            id: row.id,
            title: row.title,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
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
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<PgDueReminder> for DueReminder {
    fn from(row: PgDueReminder) -> Self {
        DueReminder {
            event: row.event.into(),
            recipient: row.recipient,
        }
    }
}

#[async_trait]
impl CalendarRepository for PostgresCalendarRepository {
    async fn create(&self, event: &CalendarEvent) -> Result<CalendarEvent, Error> {
        let row = sqlx::query_as::<_, PgCalendarEvent>(&format!(
            r#"
            INSERT INTO calendar_events ({COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
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
        .bind(event.created_at)
        .bind(event.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create calendar event");
            StorageError::Database("Failed to create calendar event".to_string())
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CalendarEvent>, Error> {
        let row = sqlx::query_as::<_, PgCalendarEvent>(&format!(
            "SELECT {COLUMNS} FROM calendar_events WHERE id = $1"
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
        let rows = sqlx::query_as::<_, PgCalendarEvent>(&format!(
            "SELECT {COLUMNS} FROM calendar_events WHERE user_id = $1 ORDER BY start_date ASC"
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
        let row = sqlx::query_as::<_, PgCalendarEvent>(&format!(
            r#"
            UPDATE calendar_events
            SET title = $1, description = $2, start_date = $3, end_date = $4, reminder_offset = $5,
                all_day = $6, color = $7, working_day = $8, sick_day = $9, vacation = $10,
                weekend = $11, send_email = $12, updated_at = $13
            WHERE id = $14
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&event.title)
        .bind(&event.description)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.reminder_offset)
        .bind(event.all_day)
        .bind(&event.color)
        .bind(event.working_day)
        .bind(event.sick_day)
        .bind(event.vacation)
        .bind(event.weekend)
        .bind(event.send_email)
        .bind(event.updated_at)
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
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = $1")
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
        let rows = sqlx::query_as::<_, PgDueReminder>(
            r#"
            SELECT e.id, e.title, e.description, e.start_date, e.end_date, e.reminder_offset,
                   e.all_day, e.color, e.working_day, e.sick_day, e.vacation, e.weekend,
                   e.send_email, e.reminder_sent, e.user_id, e.created_at, e.updated_at,
                   u.email AS recipient
            FROM calendar_events e
            LEFT JOIN users u ON u.id = e.user_id
            WHERE e.reminder_sent = FALSE
              AND e.send_email = TRUE
              AND e.start_date - make_interval(mins => e.reminder_offset) <= $1
            ORDER BY e.start_date - make_interval(mins => e.reminder_offset) ASC
            "#,
        )
        .bind(until)
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
            "UPDATE calendar_events SET reminder_sent = TRUE, updated_at = NOW() WHERE id = $1 AND reminder_sent = FALSE",
        )
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
