//! Position sequencer for ordered content.
//!
//! Positions are unique within a (kind, partition) scope. Claiming a position
//! that is already taken moves every entity at or after it one slot down, in
//! ascending order, before the caller writes its own row.
//!
//! Rows are shifted one at a time. If a write fails the claim stops with an
//! [`OrderingError`] and rows already moved stay moved.
//!
//! Claims are serialised per partition inside this process. Another process
//! writing to the same store can still race; a database constraint is the only
//! cross-process guarantee and is not installed.

use std::{marker::PhantomData, sync::Arc};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    Error,
    error::OrderingError,
    repositories::ContentRepository,
    storage::Orderable,
};

/// Summary of one claim, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftReport {
    pub shifted: usize,
}

/// A claimed position. The partition stays locked until this is dropped, so
/// the caller's own write happens before any competing claim.
#[must_use = "dropping the claim releases the partition lock"]
pub struct PositionClaim {
    pub report: ShiftReport,
    partition: String,
    _lock: OwnedMutexGuard<()>,
}

impl PositionClaim {
    pub fn partition(&self) -> &str {
        &self.partition
    }
}

pub struct PositionSequencer<T: Orderable, R: ContentRepository<T>> {
    repository: Arc<R>,
    partitions: DashMap<String, Arc<Mutex<()>>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Orderable, R: ContentRepository<T>> PositionSequencer<T, R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            partitions: DashMap::new(),
            _entity: PhantomData,
        }
    }

    /// Lock `partition` without moving anything.
    pub async fn lock(&self, partition: &str) -> PositionClaim {
        let lock = self.partition_lock(partition).lock_owned().await;
        PositionClaim {
            report: ShiftReport::default(),
            partition: partition.to_string(),
            _lock: lock,
        }
    }

    /// Make `requested` free in the partition `claim` already holds.
    ///
    /// `exclude` names an entity that is moving within the partition; it is
    /// neither treated as an occupant nor shifted.
    pub async fn shift(
        &self,
        claim: &mut PositionClaim,
        requested: i32,
        exclude: Option<Uuid>,
    ) -> Result<(), Error> {
        let report = self.shift_from(&claim.partition, requested, exclude).await?;
        claim.report.shifted += report.shifted;
        Ok(())
    }

    /// Make `requested` free in `partition` and keep the partition locked.
    pub async fn claim(
        &self,
        partition: &str,
        requested: i32,
        exclude: Option<Uuid>,
    ) -> Result<PositionClaim, Error> {
        let mut claim = self.lock(partition).await;
        self.shift(&mut claim, requested, exclude).await?;
        Ok(claim)
    }

    /// Make `requested` free in `partition` and release the lock right away.
    pub async fn claim_position(
        &self,
        partition: &str,
        requested: i32,
    ) -> Result<ShiftReport, Error> {
        Ok(self.claim(partition, requested, None).await?.report)
    }

    fn partition_lock(&self, partition: &str) -> Arc<Mutex<()>> {
        self.partitions
            .entry(partition.to_string())
            .or_default()
            .value()
            .clone()
    }

    async fn shift_from(
        &self,
        partition: &str,
        requested: i32,
        exclude: Option<Uuid>,
    ) -> Result<ShiftReport, Error> {
        let occupant = self
            .repository
            .find_at_position(partition, requested)
            .await
            .map_err(|e| fetch_error::<T>(partition, requested, e))?;

        match occupant {
            Some(entity) if Some(entity.id()) != exclude => {}
            _ => return Ok(ShiftReport::default()),
        }

        let trailing = self
            .repository
            .list_from_position(partition, requested)
            .await
            .map_err(|e| fetch_error::<T>(partition, requested, e))?;

        let mut shifted = 0;
        for mut entity in trailing {
            if Some(entity.id()) == exclude {
                continue;
            }

            let id = entity.id();
            let Some(position) = entity.position().checked_add(1) else {
                tracing::error!(
                    kind = %T::KIND,
                    id = %id,
                    position = entity.position(),
                    shifted,
                    "Position shift overflows"
                );
                return Err(OrderingError::Overflow {
                    kind: T::KIND.as_str(),
                    id,
                    position: entity.position(),
                }
                .into());
            };
            entity.set_position(position);

            self.repository
                .save_position(&id, position)
                .await
                .map_err(|e| {
                    tracing::error!(
                        kind = %T::KIND,
                        id = %id,
                        position,
                        shifted,
                        error = %e,
                        "Position shift aborted"
                    );
                    OrderingError::Shift {
                        kind: T::KIND.as_str(),
                        id,
                        position,
                        reason: e.to_string(),
                    }
                })?;
            shifted += 1;
        }

        tracing::debug!(
            kind = %T::KIND,
            partition = %partition,
            from = requested,
            shifted,
            "Shifted positions"
        );

        Ok(ShiftReport { shifted })
    }
}

fn fetch_error<T: Orderable>(partition: &str, position: i32, e: Error) -> OrderingError {
    OrderingError::Fetch {
        kind: T::KIND.as_str(),
        partition: partition.to_string(),
        position,
        reason: e.to_string(),
    }
}
