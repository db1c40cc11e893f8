//! SQLite-backed description store

use super::DescriptionStore;
use crate::config::StorageConfig;
use crate::core_community::errors::{CommunityError, CommunityResult};
use crate::core_community::types::{CommunityId, Description};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Description store keeping one JSON snapshot per community
pub struct SqliteDescriptionStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDescriptionStore {
    /// Create a store over an existing pool, running pending migrations
    pub fn new(pool: Pool<SqliteConnectionManager>) -> CommunityResult<Self> {
        super::migrations::migrate(&pool)?;
        Ok(Self { pool })
    }

    /// Open (or create) the database file named in the storage config
    pub fn open(config: &StorageConfig) -> CommunityResult<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CommunityError::Storage(format!("Failed to create database directory: {}", e))
                })?;
            }
        }

        let manager = SqliteConnectionManager::file(&config.database_path)
            .with_init(|conn| conn.busy_timeout(Duration::from_secs(5)));
        let pool = Pool::builder().max_size(config.pool_size).build(manager)?;

        tracing::debug!(
            path = %config.database_path.display(),
            pool_size = config.pool_size,
            "Opened community snapshot database"
        );

        Self::new(pool)
    }

    /// Create an in-memory store. A single pooled connection keeps one database.
    pub fn memory() -> CommunityResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Self::new(pool)
    }

    /// Number of stored snapshots
    /// Clock of the stored snapshot, if any
    pub fn stored_clock(&self, id: &CommunityId) -> CommunityResult<Option<u64>> {
        let conn = self.pool.get()?;
        let column: Option<i64> = conn
            .query_row(
                "SELECT clock FROM community_descriptions WHERE id = ?",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(column.map(clock_from_column))
    }

    pub fn count(&self) -> CommunityResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM community_descriptions", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

/// Map a clock onto the signed column so that SQL ordering matches `u64` ordering
fn clock_column(clock: u64) -> i64 {
    (clock ^ (1 << 63)) as i64
}

fn clock_from_column(column: i64) -> u64 {
    (column as u64) ^ (1 << 63)
}

impl DescriptionStore for SqliteDescriptionStore {
    fn save(&self, id: &CommunityId, description: &Description) -> CommunityResult<bool> {
        let snapshot = serde_json::to_string(description)?;
        let clock = clock_column(description.clock);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let conn = self.pool.get()?;
        let written = conn.execute(
            "INSERT INTO community_descriptions (id, clock, snapshot, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                clock = excluded.clock,
                snapshot = excluded.snapshot,
                updated_at = excluded.updated_at
             WHERE excluded.clock >= community_descriptions.clock",
            params![id.as_bytes().as_slice(), clock, snapshot, now],
        )?;

        Ok(written > 0)
    }

    fn load(&self, id: &CommunityId) -> CommunityResult<Option<Description>> {
        let conn = self.pool.get()?;
        let snapshot: Option<String> = conn
            .query_row(
                "SELECT snapshot FROM community_descriptions WHERE id = ?",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()?;

        snapshot
            .map(|json| serde_json::from_str(&json).map_err(CommunityError::from))
            .transpose()
    }

    fn delete(&self, id: &CommunityId) -> CommunityResult<bool> {
        let conn = self.pool.get()?;
        let deleted = conn.execute(
            "DELETE FROM community_descriptions WHERE id = ?",
            params![id.as_bytes().as_slice()],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_community::types::{AccessLevel, CommunityPermissions, Member, MemberKey};

    fn description(clock: u64) -> Description {
        let mut description =
            Description::new(CommunityPermissions::with_access(AccessLevel::ManualAccept));
        description.clock = clock;
        description.members.insert(MemberKey::new("aa"), Member::new());
        description
    }

    #[test]
    fn test_save_and_load_snapshot() {
        let store = SqliteDescriptionStore::memory().unwrap();
        let id = CommunityId::from_bytes([1u8; 32]);

        assert!(store.load(&id).unwrap().is_none());
        assert!(store.save(&id, &description(2)).unwrap());

        let loaded = store.load(&id).unwrap().unwrap();
        assert_eq!(loaded, description(2));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_save_never_regresses_clock() {
        let store = SqliteDescriptionStore::memory().unwrap();
        let id = CommunityId::from_bytes([1u8; 32]);

        store.save(&id, &description(5)).unwrap();
        assert!(!store.save(&id, &description(3)).unwrap());
        assert_eq!(store.load(&id).unwrap().unwrap().clock, 5);

        assert!(store.save(&id, &description(6)).unwrap());
        assert_eq!(store.load(&id).unwrap().unwrap().clock, 6);
    }

    #[test]
    fn test_delete_snapshot() {
        let store = SqliteDescriptionStore::memory().unwrap();
        let id = CommunityId::from_bytes([1u8; 32]);

        store.save(&id, &description(1)).unwrap();
        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(store.load(&id).unwrap().is_none());
    }

    #[test]
    fn test_clock_column_preserves_order() {
        let clocks = [0, 1, i64::MAX as u64, i64::MAX as u64 + 1, u64::MAX];
        for pair in clocks.windows(2) {
            assert!(clock_column(pair[0]) < clock_column(pair[1]));
        }
        for clock in clocks {
            assert_eq!(clock_from_column(clock_column(clock)), clock);
        }
    }

    #[test]
    fn test_clocks_beyond_signed_range() {
        let store = SqliteDescriptionStore::memory().unwrap();
        let id = CommunityId::from_bytes([1u8; 32]);

        assert!(store.save(&id, &description(5)).unwrap());
        assert!(store.save(&id, &description(u64::MAX - 1)).unwrap());
        assert!(!store.save(&id, &description(i64::MAX as u64)).unwrap());
        assert!(store.save(&id, &description(u64::MAX)).unwrap());

        assert_eq!(store.load(&id).unwrap().unwrap().clock, u64::MAX);
        assert_eq!(store.stored_clock(&id).unwrap(), Some(u64::MAX));
    }
}
