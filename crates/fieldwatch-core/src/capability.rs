//! Offline capability handle.
//!
//! Opening the local store can fail (unwritable path, unsupported schema). The
//! app keeps running in that case; only offline saving is unavailable.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::models::{Payload, PendingId};
use crate::queue::WriteQueue;
use crate::services::LocalStore;

#[derive(Clone)]
pub enum OfflineCapability {
    Available { store: LocalStore, queue: WriteQueue },
    /// The store could not be opened; writes cannot be saved offline
    Degraded { reason: String },
}

impl OfflineCapability {
    /// Open the store at `path`. Never fails; a failed open yields `Degraded`.
    pub async fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match LocalStore::open_path(&path).await {
            Ok(store) => Self::available(store),
            Err(error) => {
                tracing::warn!(
                    "Offline storage unavailable at {}: {error}",
                    path.display()
                );
                Self::Degraded {
                    reason: error.to_string(),
                }
            }
        }
    }

    pub async fn open_in_memory() -> Self {
        match LocalStore::open_in_memory().await {
            Ok(store) => Self::available(store),
            Err(error) => {
                tracing::warn!("Offline storage unavailable: {error}");
                Self::Degraded {
                    reason: error.to_string(),
                }
            }
        }
    }

    fn available(store: LocalStore) -> Self {
        let queue = WriteQueue::new(store.clone());
        Self::Available { store, queue }
    }

    pub const fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }

    pub const fn store(&self) -> Option<&LocalStore> {
        match self {
            Self::Available { store, .. } => Some(store),
            Self::Degraded { .. } => None,
        }
    }

    pub const fn queue(&self) -> Option<&WriteQueue> {
        match self {
            Self::Available { queue, .. } => Some(queue),
            Self::Degraded { .. } => None,
        }
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Self::Available { .. } => None,
            Self::Degraded { reason } => Some(reason),
        }
    }

    /// Queue a write, or fail with [`Error::Enqueue`] when degraded.
    pub async fn enqueue(&self, payload: impl Into<Payload>) -> Result<PendingId> {
        match self {
            Self::Available { queue, .. } => queue.enqueue(payload).await,
            Self::Degraded { reason } => {
                let payload = payload.into();
                Err(Error::Enqueue {
                    kind: payload.kind(),
                    reason: format!("offline storage unavailable: {reason}"),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKind, Location, PanicAlertPayload};
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn available_capability_queues_writes() {
        let capability = OfflineCapability::open_in_memory().await;
        assert!(capability.is_available());

        let id = capability
            .enqueue(PanicAlertPayload {
                location: Some(Location::new(9.08, 8.67)),
            })
            .await
            .unwrap();

        let store = capability.store().unwrap();
        let pending = store.get_all_unsynced(EntityKind::PanicAlert).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn newer_schema_degrades_instead_of_failing() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("fieldwatch.db");
        {
            let store = LocalStore::open_path(&db_path).await.unwrap();
            store
                .execute_raw("INSERT INTO schema_version (version) VALUES (99)")
                .await
                .unwrap();
        }

        let capability = OfflineCapability::open(&db_path).await;
        assert!(!capability.is_available());
        assert!(capability.store().is_none());
        assert!(capability.degraded_reason().unwrap().contains("99"));

        let error = capability
            .enqueue(PanicAlertPayload { location: None })
            .await
            .unwrap_err();
        match error {
            Error::Enqueue { kind, reason } => {
                assert_eq!(kind, EntityKind::PanicAlert);
                assert!(reason.contains("offline storage unavailable"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unwritable_path_degrades() {
        let tmp = tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let capability = OfflineCapability::open(blocker.join("fieldwatch.db")).await;
        assert!(!capability.is_available());
    }
}
