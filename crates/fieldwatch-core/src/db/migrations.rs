//! Database migrations
//!
//! Each version only ever adds tables, indexes, or columns. Existing rows are
//! never rewritten, so unsynced writes survive any upgrade.

use crate::error::{Error, Result};
use crate::models::EntityKind;
use libsql::Connection;

/// Current schema version
pub const CURRENT_VERSION: i32 = 3;

/// Run all pending migrations
pub async fn run(conn: &Connection) -> Result<()> {
    run_to(conn, CURRENT_VERSION).await
}

/// Run migrations up to and including `target`
pub(crate) async fn run_to(conn: &Connection, target: i32) -> Result<()> {
    let version = get_version(conn)
        .await
        .map_err(|error| Error::SchemaUpgrade(format!("failed to read schema version: {error}")))?;

    if version > CURRENT_VERSION {
        return Err(Error::SchemaUpgrade(format!(
            "local store is at version {version}, newer than supported version {CURRENT_VERSION}"
        )));
    }

    if version < 1 && target >= 1 {
        apply(conn, 1, &v1_statements()).await?;
    }
    if version < 2 && target >= 2 {
        apply(conn, 2, &v2_statements()).await?;
    }
    if version < 3 && target >= 3 {
        apply(conn, 3, &v3_statements()).await?;
    }

    Ok(())
}

/// Get the current schema version
pub async fn get_version(conn: &Connection) -> Result<i32> {
    // Check if schema_version table exists
    let mut rows = conn
        .query(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
            (),
        )
        .await?;

    let exists: bool = if let Some(row) = rows.next().await? {
        row.get::<i32>(0)? != 0
    } else {
        false
    };

    if !exists {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;

    let version: i32 = if let Some(row) = rows.next().await? {
        row.get(0)?
    } else {
        0
    };

    Ok(version)
}

fn collection_statements(kind: EntityKind) -> Vec<String> {
    let table = kind.table();
    vec![
        format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                synced INTEGER NOT NULL DEFAULT 0
            )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_created ON {table}(created_at, id)"),
        format!("CREATE INDEX IF NOT EXISTS idx_{table}_synced ON {table}(synced)"),
    ]
}

fn collections_introduced_in(version: i32) -> impl Iterator<Item = EntityKind> {
    EntityKind::ALL
        .into_iter()
        .filter(move |kind| kind.introduced_in() == version)
}

/// Version 1: schema tracking plus the report and panic alert collections
fn v1_statements() -> Vec<String> {
    let mut statements = vec!["CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )"
    .to_string()];
    statements.extend(collections_introduced_in(1).flat_map(collection_statements));
    statements
}

/// Version 2: evidence, case, and note collections
fn v2_statements() -> Vec<String> {
    collections_introduced_in(2)
        .flat_map(collection_statements)
        .collect()
}

/// Version 3: delivery bookkeeping and retention support
fn v3_statements() -> Vec<String> {
    EntityKind::ALL
        .into_iter()
        .flat_map(|kind| {
            let table = kind.table();
            [
                format!("ALTER TABLE {table} ADD COLUMN synced_at INTEGER"),
                format!("ALTER TABLE {table} ADD COLUMN attempts INTEGER NOT NULL DEFAULT 0"),
                format!("ALTER TABLE {table} ADD COLUMN last_error TEXT"),
                format!("CREATE INDEX IF NOT EXISTS idx_{table}_synced_at ON {table}(synced_at)"),
            ]
        })
        .collect()
}

async fn apply(conn: &Connection, version: i32, statements: &[String]) -> Result<()> {
    // libsql doesn't have execute_batch, so we run each statement separately
    // Using a transaction for atomicity
    conn.execute("BEGIN TRANSACTION", ())
        .await
        .map_err(|error| upgrade_error(version, &error))?;

    for stmt in statements {
        if let Err(error) = conn.execute(stmt.as_str(), ()).await {
            conn.execute("ROLLBACK", ()).await.ok();
            return Err(upgrade_error(version, &error));
        }
    }

    let recorded = conn
        .execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            libsql::params![version],
        )
        .await;
    if let Err(error) = recorded {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(upgrade_error(version, &error));
    }

    if let Err(error) = conn.execute("COMMIT", ()).await {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(upgrade_error(version, &error));
    }

    tracing::info!("Migrated local store to version {version}");
    Ok(())
}

fn upgrade_error(version: i32, error: &libsql::Error) -> Error {
    Error::SchemaUpgrade(format!("migration to version {version} failed: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use libsql::Builder;

    async fn setup() -> Connection {
        let db = Builder::new_local(":memory:").build().await.unwrap();
        db.connect().unwrap()
    }

    async fn table_exists(conn: &Connection, name: &str) -> bool {
        let mut rows = conn
            .query(
                "SELECT EXISTS(
                    SELECT 1 FROM sqlite_master
                    WHERE type = 'table' AND name = ?1
                )",
                libsql::params![name],
            )
            .await
            .unwrap();

        rows.next()
            .await
            .unwrap()
            .is_some_and(|row| row.get::<i32>(0).unwrap() != 0)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations() {
        let conn = setup().await;
        run(&conn).await.unwrap();

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
        for kind in EntityKind::ALL {
            assert!(table_exists(&conn, kind.table()).await, "{kind} missing");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_migrations_idempotent() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        run(&conn).await.unwrap(); // Should not fail

        let version = get_version(&conn).await.unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn v1_store_only_has_report_and_panic_collections() {
        let conn = setup().await;
        run_to(&conn, 1).await.unwrap();

        assert_eq!(get_version(&conn).await.unwrap(), 1);
        assert!(table_exists(&conn, "reports").await);
        assert!(table_exists(&conn, "panic_alerts").await);
        assert!(!table_exists(&conn, "evidence").await);
        assert!(!table_exists(&conn, "cases").await);
        assert!(!table_exists(&conn, "notes").await);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upgrade_keeps_existing_rows_untouched() {
        let conn = setup().await;
        run_to(&conn, 1).await.unwrap();
        conn.execute(
            "INSERT INTO reports (id, payload, created_at, synced) VALUES ('report-a', '{}', 5, 0)",
            (),
        )
        .await
        .unwrap();

        run(&conn).await.unwrap();

        let mut rows = conn
            .query(
                "SELECT payload, created_at, synced, attempts, synced_at FROM reports WHERE id = 'report-a'",
                (),
            )
            .await
            .unwrap();
        let row = rows.next().await.unwrap().unwrap();
        assert_eq!(row.get::<String>(0).unwrap(), "{}");
        assert_eq!(row.get::<i64>(1).unwrap(), 5);
        assert_eq!(row.get::<i64>(2).unwrap(), 0);
        assert_eq!(row.get::<i64>(3).unwrap(), 0);
        assert_eq!(row.get::<Option<i64>>(4).unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refuses_store_from_newer_version() {
        let conn = setup().await;
        run(&conn).await.unwrap();
        conn.execute("INSERT INTO schema_version (version) VALUES (99)", ())
            .await
            .unwrap();

        let error = run(&conn).await.unwrap_err();
        assert!(matches!(error, Error::SchemaUpgrade(_)));
        assert!(error.to_string().contains("99"));
    }
}
