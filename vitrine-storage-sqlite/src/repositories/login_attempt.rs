//! SQLite implementation of the login attempt repository.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;
use vitrine_core::{
    Error, error::StorageError, repositories::LoginAttemptRepository, storage::LoginAttempt,
};

use super::from_unix;

pub struct SqliteLoginAttemptRepository {
    pool: SqlitePool,
}

impl SqliteLoginAttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteLoginAttempt {
    id: Uuid,
    email: String,
    ip: String,
    attempts: i64,
    last_attempt_at: i64,
    banned_until: Option<i64>,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteLoginAttempt> for LoginAttempt {
    fn from(row: SqliteLoginAttempt) -> Self {
        LoginAttempt {
            id: row.id,
            email: row.email,
            ip: row.ip,
            attempts: u32::try_from(row.attempts).unwrap_or(u32::MAX),
            last_attempt_at: from_unix(row.last_attempt_at),
            banned_until: row.banned_until.map(from_unix),
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        }
    }
}

#[async_trait]
impl LoginAttemptRepository for SqliteLoginAttemptRepository {
    async fn find(&self, email: &str, ip: &str) -> Result<Option<LoginAttempt>, Error> {
        let row = sqlx::query_as::<_, SqliteLoginAttempt>(
            r#"
            SELECT id, email, ip, attempts, last_attempt_at, banned_until, created_at, updated_at
            FROM login_attempts
            WHERE email = ? AND ip = ?
            "#,
        )
        .bind(email)
        .bind(ip)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to load login attempts");
            StorageError::Database("Failed to load login attempts".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn save(&self, attempt: &LoginAttempt) -> Result<LoginAttempt, Error> {
        let row = sqlx::query_as::<_, SqliteLoginAttempt>(
            r#"
            INSERT INTO login_attempts
                (id, email, ip, attempts, last_attempt_at, banned_until, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email, ip) DO UPDATE SET
                attempts = excluded.attempts,
                last_attempt_at = excluded.last_attempt_at,
                banned_until = excluded.banned_until,
                updated_at = excluded.updated_at
            RETURNING id, email, ip, attempts, last_attempt_at, banned_until, created_at, updated_at
            "#,
        )
        .bind(attempt.id)
        .bind(&attempt.email)
        .bind(&attempt.ip)
        .bind(i64::from(attempt.attempts))
        .bind(attempt.last_attempt_at.timestamp())
        .bind(attempt.banned_until.map(|t| t.timestamp()))
        .bind(attempt.created_at.timestamp())
        .bind(attempt.updated_at.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to save login attempts");
            StorageError::Database("Failed to save login attempts".to_string())
        })?;

        Ok(row.into())
    }

    async fn delete(&self, email: &str, ip: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE email = ? AND ip = ?")
            .bind(email)
            .bind(ip)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to clear login attempts");
                StorageError::Database("Failed to clear login attempts".to_string())
            })?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests::setup_test_db;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_save_upserts_on_pair() {
        let pool = setup_test_db().await;
        let repo = SqliteLoginAttemptRepository::new(pool);
        let now = Utc::now();

        let mut attempt = LoginAttempt::new("a@x.com", "1.2.3.4", now);
        attempt.attempts = 1;
        let first = repo.save(&attempt).await.unwrap();

        let mut again = LoginAttempt::new("a@x.com", "1.2.3.4", now);
        again.attempts = 3;
        again.banned_until = Some(now + Duration::minutes(5));
        let second = repo.save(&again).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.attempts, 3);
        assert_eq!(
            second.banned_until.map(|t| t.timestamp()),
            again.banned_until.map(|t| t.timestamp())
        );
    }

    #[tokio::test]
    async fn test_find_and_delete() {
        let pool = setup_test_db().await;
        let repo = SqliteLoginAttemptRepository::new(pool);

        assert!(repo.find("a@x.com", "1.2.3.4").await.unwrap().is_none());

        let attempt = LoginAttempt::new("a@x.com", "1.2.3.4", Utc::now());
        repo.save(&attempt).await.unwrap();
        assert!(repo.find("a@x.com", "1.2.3.4").await.unwrap().is_some());
        assert!(repo.find("a@x.com", "5.6.7.8").await.unwrap().is_none());

        assert_eq!(repo.delete("a@x.com", "1.2.3.4").await.unwrap(), 1);
        assert_eq!(repo.delete("a@x.com", "1.2.3.4").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_permanent_ban_round_trips() {
        let pool = setup_test_db().await;
        let repo = SqliteLoginAttemptRepository::new(pool);
        let now = Utc::now();

        let mut attempt = LoginAttempt::new("a@x.com", "1.2.3.4", now);
        attempt.attempts = 9;
        attempt.banned_until = Some(now + vitrine_core::config::permanent_ban());
        repo.save(&attempt).await.unwrap();

        let loaded = repo.find("a@x.com", "1.2.3.4").await.unwrap().unwrap();
        assert!(loaded.is_banned_at(now + Duration::days(365 * 50)));
    }
}
