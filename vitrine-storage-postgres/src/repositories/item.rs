//! PostgreSQL implementation of the catalogue item repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;
use vitrine_core::{
    Error,
    error::StorageError,
    repositories::ContentRepository,
    storage::{Item, ListQuery, NewItem},
};

use super::ordering;

const TABLE: &str = "items";
const COLUMNS: &str = "id, title, content, price, quantity, position, language, item_url, category, status, owner_id, created_at, updated_at";

pub struct PostgresItemRepository {
    pool: PgPool,
}

impl PostgresItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PgItem {
    id: Uuid,
    title: String,
    content: String,
    price: f64,
    quantity: i32,
    position: i32,
    language: String,
    item_url: Option<String>,
    category: Option<String>,
    status: bool,
    owner_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PgItem> for Item {
    fn from(row: PgItem) -> Self {
        Item {
            id: row.id,
            title: row.title,
            content: row.content,
            price: row.price,
            quantity: row.quantity,
            position: row.position,
            language: row.language,
            item_url: row.item_url,
            category: row.category,
            status: row.status,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl ContentRepository<Item> for PostgresItemRepository {
    async fn create(&self, draft: &NewItem) -> Result<Item, Error> {
        let row = sqlx::query_as::<_, PgItem>(&format!(
            r#"
            INSERT INTO items (id, title, content, price, quantity, position, language, item_url, category, status, owner_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, NOW(), NOW())
            RETURNING {COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(draft.price)
        .bind(draft.quantity)
        .bind(draft.position)
        .bind(&draft.language)
        .bind(&draft.item_url)
        .bind(&draft.category)
        .bind(draft.status)
        .bind(draft.owner_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create item");
            StorageError::Database("Failed to create item".to_string())
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Item>, Error> {
        let row = sqlx::query_as::<_, PgItem>(&format!(
            "SELECT {COLUMNS} FROM items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to get item");
            StorageError::Database("Failed to get item".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn update(&self, item: &Item) -> Result<Item, Error> {
        let row = sqlx::query_as::<_, PgItem>(&format!(
            r#"
            UPDATE items
            SET title = $1, content = $2, price = $3, quantity = $4, position = $5,
                item_url = $6, category = $7, status = $8, updated_at = NOW()
            WHERE id = $9
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&item.title)
        .bind(&item.content)
        .bind(item.price)
        .bind(item.quantity)
        .bind(item.position)
        .bind(&item.item_url)
        .bind(&item.category)
        .bind(item.status)
        .bind(item.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to update item");
            StorageError::Database("Failed to update item".to_string())
        })?
        .ok_or(StorageError::NotFound)?;

        Ok(row.into())
    }

    async fn delete(&self, id: &Uuid) -> Result<bool, Error> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete item");
                StorageError::Database("Failed to delete item".to_string())
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<Item>, Error> {
        let rows = sqlx::query_as::<_, PgItem>(&format!(
            r#"
            SELECT {COLUMNS} FROM items
            WHERE ($1::text IS NULL OR language = $1)
            ORDER BY position ASC, created_at ASC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(query.language.as_deref())
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list items");
            StorageError::Database("Failed to list items".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_at_position(&self, partition: &str, position: i32) -> Result<Option<Item>, Error> {
        let row: Option<PgItem> =
            ordering::fetch_at_position(&self.pool, TABLE, COLUMNS, partition, position).await?;
        Ok(row.map(Into::into))
    }

    async fn list_from_position(&self, partition: &str, position: i32) -> Result<Vec<Item>, Error> {
        let rows: Vec<PgItem> =
            ordering::fetch_from_position(&self.pool, TABLE, COLUMNS, partition, position).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_position(&self, id: &Uuid, position: i32) -> Result<(), Error> {
        ordering::update_position(&self.pool, TABLE, id, position).await
    }
}
