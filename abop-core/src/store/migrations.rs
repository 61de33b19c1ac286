//! Versioned schema migrations for the `SQLite`-backed store.
//!
//! Schema is deliberately generic: one `kv` table carrying every entity as a
//! JSON blob behind a prefixed text key, plus a `counters` table for atomic
//! increments (operation log sequence numbers). Entity-specific structure
//! lives in the key prefix convention (see [`super::keys`]), not in SQL
//! columns — callers are not supposed to reach for custom `WHERE` clauses.

use crate::store::error::{StoreError, StoreResult};
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: u32,
    pub up_sql: &'static str,
    pub description: &'static str,
}

#[derive(Debug)]
pub struct MigrationResult {
    pub version: u32,
    pub description: String,
}

pub struct MigrationManager {
    migrations: HashMap<u32, Migration>,
}

impl Default for MigrationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MigrationManager {
    #[must_use]
    pub fn new() -> Self {
        let migrations = all_migrations().into_iter().map(|m| (m.version, m)).collect();
        Self { migrations }
    }

    /// # Errors
    ///
    /// Returns an error if the migrations table cannot be queried.
    pub fn current_version(&self, conn: &Connection) -> StoreResult<u32> {
        let version: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_migrations WHERE applied = 1",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);
        u32::try_from(version.max(0)).map_err(|_| StoreError::MigrationFailed {
            version: 0,
            message: format!("version {version} does not fit in u32"),
        })
    }

    fn pending(&self, conn: &Connection) -> StoreResult<Vec<&Migration>> {
        let current = self.current_version(conn)?;
        let mut pending: Vec<&Migration> = self
            .migrations
            .values()
            .filter(|m| m.version > current)
            .collect();
        pending.sort_by_key(|m| m.version);
        Ok(pending)
    }

    /// # Errors
    ///
    /// Returns an error if the tracking table cannot be created, or any
    /// pending migration fails to apply.
    pub fn migrate_up(&self, conn: &mut Connection) -> StoreResult<Vec<MigrationResult>> {
        Self::setup_tracking_table(conn)?;
        let pending = self.pending(conn)?;
        if pending.is_empty() {
            debug!("store schema already at latest version");
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(pending.len());
        for migration in pending {
            results.push(Self::apply(conn, migration)?);
        }
        Ok(results)
    }

    fn apply(conn: &mut Connection, migration: &Migration) -> StoreResult<MigrationResult> {
        let tx = conn.transaction()?;
        info!(version = migration.version, "applying store migration");
        tx.execute_batch(migration.up_sql).map_err(|e| StoreError::MigrationFailed {
            version: migration.version,
            message: e.to_string(),
        })?;
        tx.execute(
            "INSERT OR REPLACE INTO schema_migrations (version, description, applied, applied_at) \
             VALUES (?1, ?2, 1, CURRENT_TIMESTAMP)",
            rusqlite::params![migration.version, migration.description],
        )?;
        tx.commit()?;
        Ok(MigrationResult {
            version: migration.version,
            description: migration.description.to_string(),
        })
    }

    fn setup_tracking_table(conn: &Connection) -> StoreResult<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied INTEGER NOT NULL DEFAULT 1,
                applied_at TIMESTAMP
            )",
        )?;
        Ok(())
    }
}

fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "generic kv and counters tables",
        up_sql: "
            CREATE TABLE IF NOT EXISTS kv (
                key   BLOB PRIMARY KEY,
                value BLOB NOT NULL
            );
            CREATE TABLE IF NOT EXISTS counters (
                name  TEXT PRIMARY KEY,
                value INTEGER NOT NULL DEFAULT 0
            );
        ",
    }]
}

/// # Errors
///
/// Returns an error if migration setup or any migration fails.
pub fn run_migrations(conn: &mut Connection) -> StoreResult<()> {
    let manager = MigrationManager::new();
    for result in manager.migrate_up(conn)? {
        info!(version = result.version, description = %result.description, "store migration applied");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrates_fresh_database_to_latest() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();

        let manager = MigrationManager::new();
        assert_eq!(manager.current_version(&conn).unwrap(), 1);
        assert!(manager.pending(&conn).unwrap().is_empty());
    }

    #[test]
    fn migrating_twice_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_migrations(&mut conn).unwrap();
        let second = run_migrations(&mut conn);
        assert!(second.is_ok());
    }
}
