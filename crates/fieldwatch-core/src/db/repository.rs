//! Pending write repository implementation

use crate::error::Result;
use crate::models::{EntityKind, Payload, PendingId, PendingWrite};
use libsql::{Connection, Row, Value};

const SELECT_COLUMNS: &str = "id, payload, created_at, synced, synced_at, attempts, last_error";

/// libSQL-backed access to the per-kind collections.
///
/// Every mutation is a single statement, so each record is updated atomically
/// and concurrent readers never observe a partial write.
pub struct LibSqlPendingWriteRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlPendingWriteRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Upsert a record into its kind's collection, keyed by id.
    ///
    /// `created_at` is kept from the first insert and a synced record never
    /// reverts to unsynced.
    pub async fn put(&self, write: &PendingWrite) -> Result<()> {
        let table = write.kind().table();
        let payload = write.payload.to_json()?;

        self.conn
            .execute(
                &format!(
                    "INSERT INTO {table} (id, payload, created_at, synced, synced_at, attempts, last_error)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                        payload = excluded.payload,
                        synced = MAX({table}.synced, excluded.synced),
                        synced_at = COALESCE({table}.synced_at, excluded.synced_at),
                        attempts = excluded.attempts,
                        last_error = excluded.last_error"
                ),
                libsql::params![
                    write.id.as_str(),
                    payload,
                    write.created_at,
                    i64::from(write.synced),
                    optional_integer(write.synced_at),
                    i64::from(write.attempts),
                    optional_text(write.last_error.as_deref()),
                ],
            )
            .await?;
        Ok(())
    }

    /// Get a record by id
    pub async fn get(&self, kind: EntityKind, id: &PendingId) -> Result<Option<PendingWrite>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {SELECT_COLUMNS} FROM {} WHERE id = ?1", kind.table()),
                libsql::params![id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_write(kind, &row)?)),
            None => Ok(None),
        }
    }

    /// All unsynced records of a kind, oldest first
    pub async fn get_all_unsynced(&self, kind: EntityKind) -> Result<Vec<PendingWrite>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM {} WHERE synced = 0 ORDER BY created_at ASC, id ASC",
                    kind.table()
                ),
                (),
            )
            .await?;

        let mut writes = Vec::new();
        while let Some(row) = rows.next().await? {
            match row_to_write(kind, &row) {
                Ok(write) => writes.push(write),
                // An undecodable row must not hold back the rest of the collection
                Err(error) => tracing::warn!("Skipping unreadable {kind} record: {error}"),
            }
        }
        Ok(writes)
    }

    /// Flip the synced flag. Returns `false` if the record is missing or
    /// already synced.
    pub async fn mark_synced(&self, kind: EntityKind, id: &PendingId, synced_at: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute(
                &format!(
                    "UPDATE {} SET synced = 1, synced_at = ?2 WHERE id = ?1 AND synced = 0",
                    kind.table()
                ),
                libsql::params![id.as_str(), synced_at],
            )
            .await?;
        Ok(changed > 0)
    }

    /// Record a failed delivery attempt on an unsynced record
    pub async fn record_delivery_failure(
        &self,
        kind: EntityKind,
        id: &PendingId,
        reason: &str,
    ) -> Result<()> {
        self.conn
            .execute(
                &format!(
                    "UPDATE {} SET attempts = attempts + 1, last_error = ?2
                     WHERE id = ?1 AND synced = 0",
                    kind.table()
                ),
                libsql::params![id.as_str(), reason],
            )
            .await?;
        Ok(())
    }

    /// Delete a record that has not been synced yet
    pub async fn remove_unsynced(&self, kind: EntityKind, id: &PendingId) -> Result<bool> {
        let removed = self
            .conn
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1 AND synced = 0", kind.table()),
                libsql::params![id.as_str()],
            )
            .await?;
        Ok(removed > 0)
    }

    /// Delete synced records whose flag was flipped before `cutoff` (Unix ms)
    pub async fn prune_synced(&self, kind: EntityKind, cutoff: i64) -> Result<u64> {
        let removed = self
            .conn
            .execute(
                &format!(
                    "DELETE FROM {} WHERE synced = 1 AND synced_at IS NOT NULL AND synced_at < ?1",
                    kind.table()
                ),
                libsql::params![cutoff],
            )
            .await?;
        Ok(removed)
    }

    /// Count all records of a kind
    pub async fn count(&self, kind: EntityKind) -> Result<u64> {
        self.count_where(kind, "1 = 1").await
    }

    /// Count unsynced records of a kind
    pub async fn count_unsynced(&self, kind: EntityKind) -> Result<u64> {
        self.count_where(kind, "synced = 0").await
    }

    async fn count_where(&self, kind: EntityKind, predicate: &str) -> Result<u64> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT COUNT(*) FROM {} WHERE {predicate}", kind.table()),
                (),
            )
            .await?;
        let count = match rows.next().await? {
            Some(row) => row.get::<i64>(0)?,
            None => 0,
        };
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn row_to_write(kind: EntityKind, row: &Row) -> Result<PendingWrite> {
    let id: String = row.get(0)?;
    let payload: String = row.get(1)?;
    let attempts: i64 = row.get(5)?;

    Ok(PendingWrite {
        id: PendingId::from(id),
        payload: Payload::from_json(kind, &payload)?,
        created_at: row.get(2)?,
        synced: row.get::<i64>(3)? != 0,
        synced_at: match row.get_value(4)? {
            Value::Integer(value) => Some(value),
            _ => None,
        },
        attempts: u32::try_from(attempts).unwrap_or(u32::MAX),
        last_error: match row.get_value(6)? {
            Value::Text(value) => Some(value),
            _ => None,
        },
    })
}

fn optional_integer(value: Option<i64>) -> Value {
    value.map_or(Value::Null, Value::Integer)
}

fn optional_text(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |text| Value::Text(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{CasePayload, Location, PanicAlertPayload};
    use pretty_assertions::assert_eq;

    fn panic_alert(created_at: i64) -> PendingWrite {
        let mut write = PendingWrite::new(Payload::PanicAlert(PanicAlertPayload {
            location: Some(Location::new(9.08, 8.67)),
        }));
        write.created_at = created_at;
        write
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn put_then_get_roundtrip() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());

        let write = PendingWrite::new(Payload::Case(CasePayload {
            title: "Break-in at depot".to_string(),
            description: "Rear door forced".to_string(),
            status: "open".to_string(),
            priority: "high".to_string(),
            assigned_to: None,
        }));
        repo.put(&write).await.unwrap();

        let fetched = repo.get(EntityKind::Case, &write.id).await.unwrap();
        assert_eq!(fetched, Some(write.clone()));
        assert_eq!(repo.get(EntityKind::Note, &write.id).await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unsynced_records_come_back_oldest_first() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());

        let newer = panic_alert(300);
        let older = panic_alert(100);
        let middle = panic_alert(200);
        for write in [&newer, &older, &middle] {
            repo.put(write).await.unwrap();
        }

        let ids = repo
            .get_all_unsynced(EntityKind::PanicAlert)
            .await
            .unwrap()
            .into_iter()
            .map(|write| write.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![older.id, middle.id, newer.id]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mark_synced_is_idempotent() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let write = panic_alert(100);
        repo.put(&write).await.unwrap();

        assert!(repo
            .mark_synced(EntityKind::PanicAlert, &write.id, 500)
            .await
            .unwrap());
        let once = repo.get(EntityKind::PanicAlert, &write.id).await.unwrap();

        assert!(!repo
            .mark_synced(EntityKind::PanicAlert, &write.id, 900)
            .await
            .unwrap());
        let twice = repo.get(EntityKind::PanicAlert, &write.id).await.unwrap();

        assert_eq!(once, twice);
        let stored = twice.unwrap();
        assert!(stored.synced);
        assert_eq!(stored.synced_at, Some(500));
        assert!(repo
            .get_all_unsynced(EntityKind::PanicAlert)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn mark_synced_missing_record_is_noop() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let missing = PendingId::from("panic-missing".to_string());

        assert!(!repo
            .mark_synced(EntityKind::PanicAlert, &missing, 1)
            .await
            .unwrap());
        assert_eq!(repo.count(EntityKind::PanicAlert).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn put_never_reverts_synced_flag() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let write = panic_alert(100);
        repo.put(&write).await.unwrap();
        repo.mark_synced(EntityKind::PanicAlert, &write.id, 200)
            .await
            .unwrap();

        let mut stale = write.clone();
        stale.created_at = 999;
        repo.put(&stale).await.unwrap();

        let stored = repo
            .get(EntityKind::PanicAlert, &write.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.synced);
        assert_eq!(stored.synced_at, Some(200));
        assert_eq!(stored.created_at, 100);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delivery_failures_are_counted_on_unsynced_rows_only() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let write = panic_alert(100);
        repo.put(&write).await.unwrap();

        repo.record_delivery_failure(EntityKind::PanicAlert, &write.id, "timeout")
            .await
            .unwrap();
        repo.record_delivery_failure(EntityKind::PanicAlert, &write.id, "HTTP 502")
            .await
            .unwrap();
        let stored = repo
            .get(EntityKind::PanicAlert, &write.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.last_error.as_deref(), Some("HTTP 502"));

        repo.mark_synced(EntityKind::PanicAlert, &write.id, 300)
            .await
            .unwrap();
        repo.record_delivery_failure(EntityKind::PanicAlert, &write.id, "late")
            .await
            .unwrap();
        let stored = repo
            .get(EntityKind::PanicAlert, &write.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts, 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn prune_only_removes_old_synced_rows() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let old_synced = panic_alert(100);
        let fresh_synced = panic_alert(200);
        let unsynced = panic_alert(50);
        for write in [&old_synced, &fresh_synced, &unsynced] {
            repo.put(write).await.unwrap();
        }
        repo.mark_synced(EntityKind::PanicAlert, &old_synced.id, 1_000)
            .await
            .unwrap();
        repo.mark_synced(EntityKind::PanicAlert, &fresh_synced.id, 9_000)
            .await
            .unwrap();

        let removed = repo
            .prune_synced(EntityKind::PanicAlert, 5_000)
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(repo.count(EntityKind::PanicAlert).await.unwrap(), 2);
        assert_eq!(repo.count_unsynced(EntityKind::PanicAlert).await.unwrap(), 1);
        assert!(repo
            .get(EntityKind::PanicAlert, &old_synced.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remove_unsynced_leaves_synced_records() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let pending = panic_alert(100);
        let delivered = panic_alert(200);
        repo.put(&pending).await.unwrap();
        repo.put(&delivered).await.unwrap();
        repo.mark_synced(EntityKind::PanicAlert, &delivered.id, 300)
            .await
            .unwrap();

        assert!(repo
            .remove_unsynced(EntityKind::PanicAlert, &pending.id)
            .await
            .unwrap());
        assert!(!repo
            .remove_unsynced(EntityKind::PanicAlert, &delivered.id)
            .await
            .unwrap());
        assert_eq!(repo.count(EntityKind::PanicAlert).await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unreadable_rows_are_skipped() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        db.connection()
            .execute(
                "INSERT INTO cases (id, payload, created_at, synced) VALUES ('case-bad', 'not json', 1, 0)",
                (),
            )
            .await
            .unwrap();
        let good = PendingWrite::new(Payload::Case(CasePayload {
            title: "t".to_string(),
            description: "d".to_string(),
            status: "open".to_string(),
            priority: "low".to_string(),
            assigned_to: Some("officer-7".to_string()),
        }));
        repo.put(&good).await.unwrap();

        let unsynced = repo.get_all_unsynced(EntityKind::Case).await.unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].id, good.id);
    }
}
