//! SQLite implementation of the blog repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use vitrine_core::{
    Error,
    error::StorageError,
    repositories::ContentRepository,
    storage::{Blog, ListQuery, NewBlog},
};

use super::{from_unix, ordering};

const TABLE: &str = "blogs";
const COLUMNS: &str =
    "id, title, content, position, language, status, owner_id, created_at, updated_at";

pub struct SqliteBlogRepository {
    pool: SqlitePool,
}

impl SqliteBlogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteBlog {
    id: Uuid,
    title: String,
    content: String,
    position: i32,
    language: String,
    status: bool,
    owner_id: Uuid,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteBlog> for Blog {
    fn from(row: SqliteBlog) -> Self {
        Blog {
            id: row.id,
            title: row.title,
            content: row.content,
            position: row.position,
            language: row.language,
            status: row.status,
            owner_id: row.owner_id,
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        }
    }
}

#[async_trait]
impl ContentRepository<Blog> for SqliteBlogRepository {
    async fn create(&self, draft: &NewBlog) -> Result<Blog, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteBlog>(&format!(
            r#"
            INSERT INTO blogs (id, title, content, position, language, status, owner_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.position)
        .bind(&draft.language)
        .bind(draft.status)
        .bind(draft.owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create blog");
            StorageError::Database("Failed to create blog".to_string())
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Blog>, Error> {
        let row = sqlx::query_as::<_, SqliteBlog>(&format!(
            "SELECT {COLUMNS} FROM blogs WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get blog");
            StorageError::Database("Failed to get blog".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn update(&self, blog: &Blog) -> Result<Blog, Error> {
        let row = sqlx::query_as::<_, SqliteBlog>(&format!(
            r#"
            UPDATE blogs
            SET title = ?, content = ?, position = ?, status = ?, updated_at = ?
            WHERE id = ?
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&blog.title)
        .bind(&blog.content)
        .bind(blog.position)
        .bind(blog.status)
        .bind(Utc::now().timestamp())
        .bind(blog.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update blog");
            StorageError::Database("Failed to update blog".to_string())
        })?
        .ok_or(StorageError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM blogs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete blog");
                StorageError::Database("Failed to delete blog".to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Blog>, Error> {
        let rows = sqlx::query_as::<_, SqliteBlog>(&format!(
            r#"
            SELECT {COLUMNS} FROM blogs
            WHERE (?1 IS NULL OR language = ?1)
            ORDER BY position ASC, created_at ASC
            LIMIT ?2 OFFSET ?3
            "#
        ))
        .bind(query.language.as_deref())
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list blogs");
            StorageError::Database("Failed to list blogs".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_at_position(&self, partition: &str, position: i32) -> Result<Option<Blog>, Error> {
        let row: Option<SqliteBlog> =
            ordering::fetch_at_position(&self.pool, TABLE, COLUMNS, partition, position).await?;
        Ok(row.map(Into::into))
    }

    async fn list_from_position(&self, partition: &str, position: i32) -> Result<Vec<Blog>, Error> {
        let rows: Vec<SqliteBlog> =
            ordering::fetch_from_position(&self.pool, TABLE, COLUMNS, partition, position).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_position(&self, id: &Uuid, position: i32) -> Result<(), Error> {
        ordering::update_position(&self.pool, TABLE, id, position).await
    }
}
