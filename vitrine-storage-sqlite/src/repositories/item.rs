//! SQLite implementation of the catalogue item repository.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;
use vitrine_core::{
    Error,
    error::StorageError,
    repositories::ContentRepository,
    storage::{Item, ListQuery, NewItem},
};

use super::{from_unix, ordering};

const TABLE: &str = "items";
const COLUMNS: &str = "id, title, content, price, quantity, position, language, item_url, category, status, owner_id, created_at, updated_at";

pub struct SqliteItemRepository {
    pool: SqlitePool,
}

impl SqliteItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SqliteItem {
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
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteItem> for Item {
    fn from(row: SqliteItem) -> Self {
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
            created_at: from_unix(row.created_at),
            updated_at: from_unix(row.updated_at),
        }
    }
}

#[async_trait]
impl ContentRepository<Item> for SqliteItemRepository {
    async fn create(&self, draft: &NewItem) -> Result<Item, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteItem>(&format!(
            r#"
            INSERT INTO items (id, title, content, price, quantity, position, language, item_url, category, status, owner_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
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
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create item");
            StorageError::Database("Failed to create item".to_string())
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Item>, Error> {
        let row = sqlx::query_as::<_, SqliteItem>(&format!(
            "SELECT {COLUMNS} FROM items WHERE id = ?"
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
        let row = sqlx::query_as::<_, SqliteItem>(&format!(
            r#"
            UPDATE items
            SET title = ?, content = ?, price = ?, quantity = ?, position = ?,
                item_url = ?, category = ?, status = ?, updated_at = ?
            WHERE id = ?
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
        .bind(Utc::now().timestamp())
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
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
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
        let rows = sqlx::query_as::<_, SqliteItem>(&format!(
            r#"
            SELECT {COLUMNS} FROM items
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
            tracing::error!(error = %e, "Failed to list items");
            StorageError::Database("Failed to list items".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_at_position(&self, partition: &str, position: i32) -> Result<Option<Item>, Error> {
        let row: Option<SqliteItem> =
            ordering::fetch_at_position(&self.pool, TABLE, COLUMNS, partition, position).await?;
        Ok(row.map(Into::into))
    }

    async fn list_from_position(&self, partition: &str, position: i32) -> Result<Vec<Item>, Error> {
        let rows: Vec<SqliteItem> =
            ordering::fetch_from_position(&self.pool, TABLE, COLUMNS, partition, position).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn save_position(&self, id: &Uuid, position: i32) -> Result<(), Error> {
        ordering::update_position(&self.pool, TABLE, id, position).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::tests::{create_test_user, setup_test_db};
    use std::sync::Arc;
    use vitrine_core::services::ContentService;

    fn draft(title: &str, position: i32) -> NewItem {
        NewItem {
            title: title.to_string(),
            content: String::new(),
            price: 12.5,
            quantity: 3,
            position,
            language: "pl".to_string(),
            item_url: Some("https://shop.example.com/mug".to_string()),
            category: Some("kitchen".to_string()),
            status: true,
            owner_id: Uuid::nil(),
        }
    }

    #[tokio::test]
    async fn test_item_fields_round_trip() {
        let pool = setup_test_db().await;
        let owner = create_test_user(&pool, "seller@example.com").await;
        let repo = SqliteItemRepository::new(pool);

        let mut new = draft("Mug", 0);
        new.owner_id = owner;
        let item = repo.create(&new).await.unwrap();

        let found = repo.find_by_id(&item.id).await.unwrap().unwrap();
        assert_eq!(found.price, 12.5);
        assert_eq!(found.quantity, 3);
        assert_eq!(found.item_url.as_deref(), Some("https://shop.example.com/mug"));
        assert_eq!(found.category.as_deref(), Some("kitchen"));
    }

    #[tokio::test]
    async fn test_service_shifts_rows_in_database() {
        let pool = setup_test_db().await;
        let owner = create_test_user(&pool, "seller@example.com").await;
        let repo = Arc::new(SqliteItemRepository::new(pool));
        let service = ContentService::new(repo.clone());

        let a = service.create(owner, draft("A", 2)).await.unwrap();
        let b = service.create(owner, draft("B", 3)).await.unwrap();
        let c = service.create(owner, draft("C", 7)).await.unwrap();
        let new = service.create(owner, draft("New", 2)).await.unwrap();

        let listed = repo.list(&ListQuery::language("pl")).await.unwrap();
        let order: Vec<(Uuid, i32)> = listed.iter().map(|i| (i.id, i.position)).collect();
        assert_eq!(
            order,
            vec![(new.id, 2), (a.id, 3), (b.id, 4), (c.id, 8)]
        );
    }

    #[tokio::test]
    async fn test_concurrent_creates_keep_positions_unique() {
        let pool = setup_test_db().await;
        let owner = create_test_user(&pool, "seller@example.com").await;
        let service = Arc::new(ContentService::new(Arc::new(SqliteItemRepository::new(
            pool.clone(),
        ))));

        let mut handles = Vec::new();
        for i in 0..8 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service.create(owner, draft(&format!("item {i}"), 0)).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let positions: Vec<i32> = sqlx::query_scalar("SELECT position FROM items ORDER BY position")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(positions, (0..8).collect::<Vec<i32>>());
    }
}
