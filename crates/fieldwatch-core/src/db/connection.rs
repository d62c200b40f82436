//! Database connection management

use crate::error::Result;
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::Path;

use super::migrations;

/// Database wrapper for the on-device libSQL store
pub struct Database {
    // Keeps the database handle alive for as long as the connection is used.
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically. Opening an up-to-date store is a no-op;
    /// opening an older one only adds what is missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let db = Builder::new_local(&path_str).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        Ok(database)
    }

    /// Configure `SQLite` for durable single-device use
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases; ignore the refusal there
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = FULL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA busy_timeout = 5000;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Schema version recorded in the store
    pub async fn schema_version(&self) -> Result<i32> {
        migrations::get_version(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LibSqlPendingWriteRepository;
    use crate::models::EntityKind;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reopening_at_same_version_keeps_data() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("fieldwatch.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            db.connection()
                .execute(
                    "INSERT INTO notes (id, payload, created_at, synced)
                     VALUES ('note-1', '{\"content\":\"hi\"}', 10, 0)",
                    (),
                )
                .await
                .unwrap();
        }

        let db = Database::open(&db_path).await.unwrap();
        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let notes = repo.get_all_unsynced(EntityKind::Note).await.unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id.as_str(), "note-1");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn opening_v1_store_upgrades_without_losing_unsynced_reports() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("fieldwatch.db");

        {
            let db = Builder::new_local(db_path.to_string_lossy().to_string())
                .build()
                .await
                .unwrap();
            let conn = db.connect().unwrap();
            migrations::run_to(&conn, 1).await.unwrap();
            for (id, created_at) in [("report-old-1", 100_i64), ("report-old-2", 200_i64)] {
                conn.execute(
                    "INSERT INTO reports (id, payload, created_at, synced) VALUES (?1, ?2, ?3, 0)",
                    libsql::params![
                        id,
                        r#"{"description":"broken streetlight","location":{"lat":9.08,"lng":8.67}}"#,
                        created_at
                    ],
                )
                .await
                .unwrap();
            }
        }

        let db = Database::open(&db_path).await.unwrap();
        assert_eq!(db.schema_version().await.unwrap(), migrations::CURRENT_VERSION);

        let repo = LibSqlPendingWriteRepository::new(db.connection());
        let reports = repo.get_all_unsynced(EntityKind::Report).await.unwrap();
        let ids = reports
            .iter()
            .map(|write| write.id.as_str().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["report-old-1", "report-old-2"]);
        assert!(reports.iter().all(|write| !write.synced));

        for kind in [EntityKind::Evidence, EntityKind::Case, EntityKind::Note] {
            assert!(repo.get_all_unsynced(kind).await.unwrap().is_empty());
            assert_eq!(repo.count(kind).await.unwrap(), 0);
        }
    }
}
