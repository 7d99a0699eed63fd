use bejaia_core::repository::BlockedDateRepository;
use bejaia_core::{Clock, CoreError, CoreResult};
use bejaia_shared::BlockedDate;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::info;

use crate::locks::{slot_key, KeyedLocks};

/// Maintains the (item, date) pairs that cannot be reserved. Changes take
/// the same per-slot lock as admissions.
pub struct BlockedDateGuard {
    repo: Arc<dyn BlockedDateRepository>,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
}

impl BlockedDateGuard {
    pub fn new(repo: Arc<dyn BlockedDateRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock, locks: KeyedLocks::new() }
    }

    pub async fn lock(&self, item_id: &str, date: NaiveDate) -> OwnedMutexGuard<()> {
        self.locks.lock(&slot_key(item_id, date)).await
    }

    pub fn prune_locks(&self) {
        self.locks.prune();
    }

    pub async fn is_blocked(&self, item_id: &str, date: NaiveDate) -> CoreResult<bool> {
        let found = self.repo.find_one(item_id, date).await.map_err(CoreError::storage)?;
        Ok(found.is_some())
    }

    pub async fn block(
        &self,
        item_id: &str,
        date: NaiveDate,
        reason: Option<String>,
    ) -> CoreResult<BlockedDate> {
        let blocked = BlockedDate::new(item_id.to_string(), date, reason, self.clock.now());
        let created = {
            let _guard = self.lock(item_id, date).await;
            self.repo.create(&blocked).await.map_err(CoreError::storage)?
        };
        self.prune_locks();

        if !created {
            return Err(CoreError::AlreadyBlocked { item_id: item_id.to_string(), date });
        }
        info!("Blocked {} on {}", item_id, date);
        Ok(blocked)
    }

    pub async fn unblock(&self, item_id: &str, date: NaiveDate) -> CoreResult<()> {
        let deleted = {
            let _guard = self.lock(item_id, date).await;
            self.repo.delete(item_id, date).await.map_err(CoreError::storage)?
        };
        self.prune_locks();

        if !deleted {
            return Err(CoreError::not_found(format!("Blocked date {} for {}", date, item_id)));
        }
        info!("Unblocked {} on {}", item_id, date);
        Ok(())
    }

    /// Blocked dates of an item, ascending
    pub async fn list(&self, item_id: &str) -> CoreResult<Vec<BlockedDate>> {
        self.repo.list(item_id).await.map_err(CoreError::storage)
    }
}
