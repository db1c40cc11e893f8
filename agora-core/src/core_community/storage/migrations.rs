//! Database migrations for description snapshots
//!
//! Each migration runs in its own transaction and is recorded in the
//! `community_schema_version` table.

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current schema version for community snapshots
pub const CURRENT_COMMUNITY_SCHEMA_VERSION: i32 = 3;

/// Migration descriptor
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub up_sql: &'static str,
}

/// All available migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            version: 1,
            description: "Community description snapshots",
            up_sql: r#"
                CREATE TABLE IF NOT EXISTS community_descriptions (
                    id BLOB PRIMARY KEY,                    -- CommunityId (32 bytes)
                    clock INTEGER NOT NULL,                 -- Lamport clock of the snapshot
                    snapshot TEXT NOT NULL,                 -- JSON encoded Description
                    updated_at INTEGER NOT NULL
                );
            "#,
        },
        Migration {
            version: 2,
            description: "Index snapshots by update time",
            up_sql: r#"
                CREATE INDEX IF NOT EXISTS idx_community_descriptions_updated
                    ON community_descriptions(updated_at);
            "#,
        },
        Migration {
            version: 3,
            description: "Store clocks with the sign bit flipped",
            // Rows written before this migration hold clocks in 0..=i64::MAX
            up_sql: r#"
                UPDATE community_descriptions
                    SET clock = clock + (-9223372036854775807 - 1);
            "#,
        },
    ]
}

fn pool_error(e: r2d2::Error) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("Failed to get connection: {}", e),
    )))
}

/// Get current schema version from database
fn get_current_version(pool: &Pool<SqliteConnectionManager>) -> Result<i32, rusqlite::Error> {
    let conn = pool.get().map_err(pool_error)?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS community_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Result<i32, _> = conn.query_row(
        "SELECT version FROM community_schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    Ok(version.unwrap_or(0))
}

/// Run all pending migrations
pub fn migrate(pool: &Pool<SqliteConnectionManager>) -> Result<(), rusqlite::Error> {
    let current_version = get_current_version(pool)?;

    let pending_migrations: Vec<_> = get_migrations()
        .into_iter()
        .filter(|m| m.version > current_version)
        .collect();

    if pending_migrations.is_empty() {
        return Ok(());
    }

    let conn = pool.get().map_err(pool_error)?;

    for migration in pending_migrations {
        let tx = conn.unchecked_transaction()?;

        tx.execute_batch(migration.up_sql)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        tx.execute(
            "INSERT INTO community_schema_version (version, applied_at) VALUES (?, ?)",
            params![migration.version, now],
        )?;

        tx.commit()?;

        tracing::info!(
            version = migration.version,
            description = migration.description,
            "Applied community schema migration"
        );
    }

    Ok(())
}

/// Get the latest migration version available
pub fn get_latest_version() -> i32 {
    get_migrations().iter().map(|m| m.version).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_pool() -> Pool<SqliteConnectionManager> {
        let manager = SqliteConnectionManager::memory();
        Pool::builder()
            .max_size(1)
            .build(manager)
            .expect("Failed to create pool")
    }

    #[test]
    fn test_initial_migration() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let conn = pool.get().unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();

        assert!(tables.contains(&"community_descriptions".to_string()));
        assert!(tables.contains(&"community_schema_version".to_string()));
    }

    #[test]
    fn test_migration_version_tracking() {
        let pool = setup_test_pool();
        migrate(&pool).expect("Migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_COMMUNITY_SCHEMA_VERSION);
        assert_eq!(get_latest_version(), CURRENT_COMMUNITY_SCHEMA_VERSION);
    }

    #[test]
    fn test_clock_migration_rebiases_existing_rows() {
        let pool = setup_test_pool();
        {
            let conn = pool.get().unwrap();
            conn.execute_batch(
                "CREATE TABLE community_schema_version (
                    version INTEGER PRIMARY KEY,
                    applied_at INTEGER NOT NULL
                );
                INSERT INTO community_schema_version VALUES (2, 0);",
            )
            .unwrap();
            for migration in get_migrations().iter().take(2) {
                conn.execute_batch(migration.up_sql).unwrap();
            }
            conn.execute(
                "INSERT INTO community_descriptions VALUES (x'01', 7, '{}', 0)",
                [],
            )
            .unwrap();
        }

        migrate(&pool).expect("Migration failed");

        let conn = pool.get().unwrap();
        let clock: i64 = conn
            .query_row("SELECT clock FROM community_descriptions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(clock, (7u64 ^ (1 << 63)) as i64);
    }

    #[test]
    fn test_idempotent_migrations() {
        let pool = setup_test_pool();

        migrate(&pool).expect("First migration failed");
        migrate(&pool).expect("Second migration failed");

        let version = get_current_version(&pool).expect("Failed to get version");
        assert_eq!(version, CURRENT_COMMUNITY_SCHEMA_VERSION);
    }
}
