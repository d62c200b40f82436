//! Write enqueue API.
//!
//! The only way application code creates a pending offline write. Payloads
//! arrive already validated; this layer assigns the id, stamps the creation
//! time, and persists the record unsynced.

use crate::error::{Error, Result};
use crate::models::{EntityKind, Payload, PendingId, PendingWrite};
use crate::services::LocalStore;

#[derive(Clone)]
pub struct WriteQueue {
    store: LocalStore,
}

impl WriteQueue {
    pub const fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub const fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Persist a new pending write and return its id.
    ///
    /// Storage failures surface as [`Error::Enqueue`]; the write is never
    /// reported as saved unless the `put` succeeded.
    pub async fn enqueue(&self, payload: impl Into<Payload>) -> Result<PendingId> {
        let write = PendingWrite::new(payload.into());
        let kind = write.kind();

        self.store.put(&write).await.map_err(|error| {
            tracing::warn!("Failed to persist pending {kind}: {error}");
            Error::Enqueue {
                kind,
                reason: error.to_string(),
            }
        })?;

        tracing::debug!("Queued {kind} write {}", write.id);
        Ok(write.id)
    }

    /// Drop a write that has not been delivered yet.
    ///
    /// Returns `false` when the id is unknown or the write already synced.
    pub async fn cancel(&self, kind: EntityKind, id: &PendingId) -> Result<bool> {
        let removed = self.store.remove_unsynced(kind, id).await?;
        if removed {
            tracing::info!("Cancelled pending {kind} write {id}");
        }
        Ok(removed)
    }
}
