//! Position queries shared by the blog and item repositories.

use sqlx::{SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;
use vitrine_core::{Error, error::StorageError};

pub(crate) async fn fetch_at_position<R>(
    pool: &SqlitePool,
    table: &str,
    columns: &str,
    partition: &str,
    position: i32,
) -> Result<Option<R>, Error>
where
    R: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
{
    sqlx::query_as::<_, R>(&format!(
        "SELECT {columns} FROM {table} WHERE language = ? AND position = ? LIMIT 1"
    ))
    .bind(partition)
    .bind(position)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, table, "Failed to look up position");
        StorageError::Database(format!("Failed to look up position in {table}")).into()
    })
}

pub(crate) async fn fetch_from_position<R>(
    pool: &SqlitePool,
    table: &str,
    columns: &str,
    partition: &str,
    position: i32,
) -> Result<Vec<R>, Error>
where
    R: for<'r> sqlx::FromRow<'r, SqliteRow> + Send + Unpin,
{
    sqlx::query_as::<_, R>(&format!(
        "SELECT {columns} FROM {table} WHERE language = ? AND position >= ? ORDER BY position ASC, created_at ASC"
    ))
    .bind(partition)
    .bind(position)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, table, "Failed to list trailing positions");
        StorageError::Database(format!("Failed to list trailing positions in {table}")).into()
    })
}

pub(crate) async fn update_position(
    pool: &SqlitePool,
    table: &str,
    id: &Uuid,
    position: i32,
) -> Result<(), Error> {
    let result = sqlx::query(&format!(
        "UPDATE {table} SET position = ?, updated_at = unixepoch() WHERE id = ?"
    ))
    .bind(position)
    .bind(id)
    .execute(pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, table, "Failed to save position");
        StorageError::Database(format!("Failed to save position in {table}"))
    })?;

    if result.rows_affected() == 0 {
        return Err(StorageError::NotFound.into());
    }

    Ok(())
}
