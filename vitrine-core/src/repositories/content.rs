//! Repository trait for position-ordered content.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    Error,
    storage::{ListQuery, Orderable},
};

/// Storage for an ordered collection partitioned by language.
#[async_trait]
pub trait ContentRepository<T: Orderable>: Send + Sync + 'static {
    async fn create(&self, draft: &T::Draft) -> Result<T, Error>;

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<T>, Error>;

    /// Persist every field of an existing entity.
    async fn update(&self, entity: &T) -> Result<T, Error>;

    /// Returns `false` when no entity had that id.
    async fn delete(&self, id: &Uuid) -> Result<bool, Error>;

    /// Page through a collection ordered by position, optionally within one partition.
    async fn list(&self, query: &ListQuery) -> Result<Vec<T>, Error>;

    /// The entity holding an exact position in a partition.
    async fn find_at_position(&self, partition: &str, position: i32) -> Result<Option<T>, Error>;

    /// Every entity of a partition at or after `position`, in ascending position order.
    async fn list_from_position(&self, partition: &str, position: i32) -> Result<Vec<T>, Error>;

    /// Write only the position of an entity. Fails with not-found when the row is gone.
    async fn save_position(&self, id: &Uuid, position: i32) -> Result<(), Error>;
}
