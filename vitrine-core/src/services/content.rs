//! Ordered content service.
//!
//! Every write that sets a position goes through the [`PositionSequencer`]
//! first, so positions stay unique within a language.

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    Error,
    error::{
        AuthError, StorageError, ValidationError,
        utilities::{FoundExt, require_text},
    },
    repositories::ContentRepository,
    services::sequencer::PositionSequencer,
    storage::{ContentDraft, ContentPatch, ListQuery, Orderable},
};

pub struct ContentService<T: Orderable, R: ContentRepository<T>> {
    repository: Arc<R>,
    sequencer: PositionSequencer<T, R>,
}

impl<T: Orderable, R: ContentRepository<T>> ContentService<T, R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            sequencer: PositionSequencer::new(repository.clone()),
            repository,
        }
    }

    pub fn sequencer(&self) -> &PositionSequencer<T, R> {
        &self.sequencer
    }

    /// Create an entity owned by `owner` at the draft's position.
    pub async fn create(&self, owner: Uuid, mut draft: T::Draft) -> Result<T, Error> {
        require_text(draft.title(), "title")?;
        require_text(draft.partition(), "language")?;
        validate_position(draft.position())?;
        draft.set_owner(owner);

        let claim = self
            .sequencer
            .claim(draft.partition(), draft.position(), None)
            .await?;
        let entity = self.repository.create(&draft).await?;
        drop(claim);

        tracing::info!(
            kind = %T::KIND,
            id = %entity.id(),
            partition = %entity.partition(),
            position = entity.position(),
            "Created ordered entity"
        );

        Ok(entity)
    }

    pub async fn get(&self, id: &Uuid) -> Result<T, Error> {
        self.repository.find_by_id(id).await.found()
    }

    /// Apply a partial update. A new position is claimed in the entity's own partition.
    ///
    /// The partition stays locked from the re-read to the write, so a shift
    /// by a concurrent claim is never overwritten with a stale position.
    pub async fn update(&self, actor: Uuid, id: &Uuid, patch: T::Patch) -> Result<T, Error> {
        if let Some(title) = patch.title() {
            require_text(title, "title")?;
        }
        if let Some(position) = patch.requested_position() {
            validate_position(position)?;
        }

        let partition = self.owned(actor, id).await?.partition().to_string();
        let mut claim = self.sequencer.lock(&partition).await;
        let mut entity = self.owned(actor, id).await?;

        match patch.requested_position() {
            Some(position) if position != entity.position() => {
                self.sequencer
                    .shift(&mut claim, position, Some(entity.id()))
                    .await?
            }
            _ => {}
        }

        patch.apply_to(&mut entity);
        let updated = self.repository.update(&entity).await?;
        drop(claim);

        Ok(updated)
    }

    /// Delete an entity. Positions of the remaining entities are left as they are.
    pub async fn delete(&self, actor: Uuid, id: &Uuid) -> Result<(), Error> {
        self.owned(actor, id).await?;

        if !self.repository.delete(id).await? {
            return Err(StorageError::NotFound.into());
        }

        Ok(())
    }

    pub async fn list(&self, query: &ListQuery) -> Result<Vec<T>, Error> {
        self.repository.list(query).await
    }

    async fn owned(&self, actor: Uuid, id: &Uuid) -> Result<T, Error> {
        let entity = self.get(id).await?;
        if entity.owner_id() != actor {
            return Err(AuthError::NotOwner(format!("{} {id}", T::KIND)).into());
        }
        Ok(entity)
    }
}

fn validate_position(position: i32) -> Result<(), ValidationError> {
    if position < 0 {
        return Err(ValidationError::InvalidPosition(position));
    }
    Ok(())
}
