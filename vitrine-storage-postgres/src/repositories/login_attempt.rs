//! PostgreSQL implementation of the login attempt repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vitrine_core::{
    Error, error::StorageError, repositories::LoginAttemptRepository, storage::LoginAttempt,
};

pub struct PostgresLoginAttemptRepository {
    pool: PgPool,
}

impl PostgresLoginAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PgLoginAttempt {
    id: Uuid,
    email: String,
    ip: String,
    attempts: i32,
    last_attempt_at: DateTime<Utc>,
    banned_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PgLoginAttempt> for LoginAttempt {
    fn from(row: PgLoginAttempt) -> Self {
        LoginAttempt {
            id: row.id,
            email: row.email,
            ip: row.ip,
            attempts: u32::try_from(row.attempts).unwrap_or_default(),
            last_attempt_at: row.last_attempt_at,
            banned_until: row.banned_until,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl LoginAttemptRepository for PostgresLoginAttemptRepository {
    async fn find(&self, email: &str, ip: &str) -> Result<Option<LoginAttempt>, Error> {
        let row = sqlx::query_as::<_, PgLoginAttempt>(
            r#"
            SELECT id, email, ip, attempts, last_attempt_at, banned_until, created_at, updated_at
            FROM login_attempts
            WHERE email = $1 AND ip = $2
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
        let row = sqlx::query_as::<_, PgLoginAttempt>(
            r#"
            INSERT INTO login_attempts
                (id, email, ip, attempts, last_attempt_at, banned_until, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (email, ip) DO UPDATE SET
                attempts = EXCLUDED.attempts,
                last_attempt_at = EXCLUDED.last_attempt_at,
                banned_until = EXCLUDED.banned_until,
                updated_at = EXCLUDED.updated_at
            RETURNING id, email, ip, attempts, last_attempt_at, banned_until, created_at, updated_at
            "#,
        )
        .bind(attempt.id)
        .bind(&attempt.email)
        .bind(&attempt.ip)
        .bind(i32::try_from(attempt.attempts).unwrap_or(i32::MAX))
        .bind(attempt.last_attempt_at)
        .bind(attempt.banned_until)
        .bind(attempt.created_at)
        .bind(attempt.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to save login attempts");
            StorageError::Database("Failed to save login attempts".to_string())
        })?;

        Ok(row.into())
    }

    async fn delete(&self, email: &str, ip: &str) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE email = $1 AND ip = $2")
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
    use chrono::Duration;

    #[tokio::test]
    #[ignore = "requires PostgreSQL on localhost:5432"]
    async fn test_save_upserts_on_pair() {
        let repo = PostgresLoginAttemptRepository::new(setup_test_db().await);
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
        assert!(second.banned_until.is_some());
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL on localhost:5432"]
    async fn test_delete_clears_only_pair() {
        let repo = PostgresLoginAttemptRepository::new(setup_test_db().await);
        let now = Utc::now();
        repo.save(&LoginAttempt::new("a@x.com", "1.1.1.1", now))
            .await
            .unwrap();
        repo.save(&LoginAttempt::new("a@x.com", "2.2.2.2", now))
            .await
            .unwrap();

        assert_eq!(repo.delete("a@x.com", "1.1.1.1").await.unwrap(), 1);
        assert!(repo.find("a@x.com", "1.1.1.1").await.unwrap().is_none());
        assert!(repo.find("a@x.com", "2.2.2.2").await.unwrap().is_some());
    }
}
