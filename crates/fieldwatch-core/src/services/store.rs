//! Shared local store used by the enqueue API and the sync driver.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, LibSqlPendingWriteRepository};
use crate::models::{EntityKind, PendingId, PendingWrite};
use crate::util::unix_millis_now;
use crate::Result;

/// Thread-safe handle to the durable local store.
///
/// Clones share one connection; every operation holds the lock for its single
/// statement, so callers on different tasks are serialized without lost
/// updates.
#[derive(Clone)]
pub struct LocalStore {
    db: Arc<Mutex<Database>>,
    db_path: Option<PathBuf>,
}

impl LocalStore {
    /// Open the store at the given filesystem path, creating parent directories.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        tracing::debug!("Opened local store at {}", db_path.display());
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: Some(db_path),
        })
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            db_path: None,
        })
    }

    /// Filesystem location, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Schema version recorded in the store.
    pub async fn schema_version(&self) -> Result<i32> {
        let db = self.db.lock().await;
        db.schema_version().await
    }

    /// Upsert a record into its kind's collection.
    pub async fn put(&self, write: &PendingWrite) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        repo.put(write).await
    }

    /// Fetch one record.
    pub async fn get(&self, kind: EntityKind, id: &PendingId) -> Result<Option<PendingWrite>> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        repo.get(kind, id).await
    }

    /// All unsynced records of a kind, ascending by creation time.
    pub async fn get_all_unsynced(&self, kind: EntityKind) -> Result<Vec<PendingWrite>> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        repo.get_all_unsynced(kind).await
    }

    /// Flip one record to synced. No-op for missing or already-synced records.
    pub async fn mark_synced(&self, kind: EntityKind, id: &PendingId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        repo.mark_synced(kind, id, unix_millis_now()).await
    }

    /// Record a failed delivery attempt.
    pub async fn record_delivery_failure(
        &self,
        kind: EntityKind,
        id: &PendingId,
        reason: &str,
    ) -> Result<()> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        repo.record_delivery_failure(kind, id, reason).await
    }

    /// Remove a write that has not been delivered yet.
    pub async fn remove_unsynced(&self, kind: EntityKind, id: &PendingId) -> Result<bool> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        repo.remove_unsynced(kind, id).await
    }

    /// Unsynced record count per kind.
    pub async fn pending_counts(&self) -> Result<BTreeMap<EntityKind, u64>> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let mut counts = BTreeMap::new();
        for kind in EntityKind::ALL {
            counts.insert(kind, repo.count_unsynced(kind).await?);
        }
        Ok(counts)
    }

    /// Delete synced records whose flag was flipped before `cutoff` (Unix ms).
    ///
    /// Unsynced records are never touched.
    pub async fn prune_synced(&self, cutoff: i64) -> Result<u64> {
        let db = self.db.lock().await;
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let mut removed = 0;
        for kind in EntityKind::ALL {
            let pruned = repo.prune_synced(kind, cutoff).await?;
            if pruned > 0 {
                tracing::info!("Pruned {pruned} synced {kind} record(s)");
            }
            removed += pruned;
        }
        Ok(removed)
    }

    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection().execute(sql, ()).await?;
        Ok(())
    }
}
