//! `SQLite`-backed [`Store`] implementation.

use super::health::{ConnectionHealth, HealthMonitor};
use super::migrations;
use super::retry::{RetryExecutor, RetryPolicy};
use super::{BatchOp, Store, StoreError, StoreResult};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Pool configuration. The default opens an in-memory database, matching
/// the teacher's `PoolConfig::default` — tests get a store for free.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: String,
    pub max_connections: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: ":memory:".to_string(),
            max_connections: 4,
        }
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Arc<Pool<SqliteConnectionManager>>,
    retry: RetryExecutor,
    health: Arc<HealthMonitor>,
}

impl SqliteStore {
    /// Opens (creating if needed) a pooled `SQLite` store and runs pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created, a connection cannot
    /// be established, or migrations fail.
    #[instrument(skip(config))]
    pub fn open(config: SqliteConfig) -> StoreResult<Self> {
        let manager = SqliteConnectionManager::file(&config.path);
        let pool = Pool::builder()
            .max_size(config.max_connections)
            .build(manager)
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        let mut conn = pool.get()?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )?;
        migrations::run_migrations(&mut conn)?;
        debug!(path = %config.path, "sqlite store ready");

        Ok(Self {
            pool: Arc::new(pool),
            retry: RetryExecutor::new(RetryPolicy::default()),
            health: Arc::new(HealthMonitor::default()),
        })
    }

    /// Opens an in-memory store. Convenience wrapper used by tests and by
    /// `abop-cli` when no `root_dir` config has been set yet.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail against the fresh in-memory
    /// database (should not happen outside of a corrupted build).
    pub fn in_memory() -> StoreResult<Self> {
        Self::open(SqliteConfig::default())
    }

    /// Opens a store backed by a file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or migrations fail.
    pub fn open_path(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open(SqliteConfig {
            path: path.as_ref().to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    #[must_use]
    pub fn health(&self) -> ConnectionHealth {
        self.health.status()
    }

    fn record_result<T>(&self, result: StoreResult<T>) -> StoreResult<T> {
        match &result {
            Ok(_) => self.health.record(ConnectionHealth::Healthy),
            Err(StoreError::ConnectionFailed(_)) => self.health.record(ConnectionHealth::Failed),
            Err(_) => self.health.record(ConnectionHealth::Degraded),
        }
        result
    }
}

impl Store for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        let result = self.retry.execute(|| {
            let conn = self.pool.get()?;
            conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, Vec<u8>>(0)
            })
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StoreError::from(other)),
            })
        });
        self.record_result(result)
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let result = self.retry.execute(|| {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        });
        self.record_result(result)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let result = self.retry.execute(|| {
            let conn = self.pool.get()?;
            conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
            Ok(())
        });
        self.record_result(result)
    }

    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        let result = self.retry.execute(|| {
            let conn = self.pool.get()?;
            // A half-open range on the key column lets SQLite use the
            // primary key index instead of a full table scan with LIKE.
            let upper_bound = prefix_upper_bound(prefix);
            let mut stmt = conn.prepare(
                "SELECT key, value FROM kv WHERE key >= ?1 AND key < ?2 ORDER BY key",
            )?;
            let rows = stmt
                .query_map(params![prefix, upper_bound], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, Vec<u8>>(1)?))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        });
        self.record_result(result)
    }

    fn batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        let result = self.retry.execute(|| {
            let mut conn = self.pool.get()?;
            let tx = conn.transaction()?;
            for op in &ops {
                match op {
                    BatchOp::Put { key, value } => {
                        tx.execute(
                            "INSERT INTO kv (key, value) VALUES (?1, ?2) \
                             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                            params![key, value],
                        )?;
                    }
                    BatchOp::Delete { key } => {
                        tx.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
                    }
                }
            }
            tx.commit()?;
            Ok(())
        });
        self.record_result(result)
    }

    fn increment(&self, counter: &str) -> StoreResult<i64> {
        let result = self.retry.execute(|| {
            let conn = self.pool.get()?;
            conn.execute(
                "INSERT INTO counters (name, value) VALUES (?1, 1) \
                 ON CONFLICT(name) DO UPDATE SET value = value + 1",
                params![counter],
            )?;
            conn.query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![counter],
                |row| row.get(0),
            )
            .map_err(StoreError::from)
        });
        self.record_result(result)
    }

    fn wipe(&self) -> StoreResult<()> {
        let result = self.retry.execute(|| {
            let conn = self.pool.get()?;
            conn.execute_batch("DELETE FROM kv; DELETE FROM counters;")?;
            Ok(())
        });
        self.record_result(result)
    }
}

/// The smallest string that sorts after every string starting with
/// `prefix`, used to turn a prefix scan into an indexed range query.
fn prefix_upper_bound(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    for i in (0..bytes.len()).rev() {
        if bytes[i] != 0xff {
            bytes[i] += 1;
            bytes.truncate(i + 1);
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    format!("{prefix}\u{10ffff}")
}
