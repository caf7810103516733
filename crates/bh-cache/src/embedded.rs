// SPDX-License-Identifier: MIT

use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::{CacheError, MetadataCache};

/// A sqlite-file-backed cache for single-host installs: no daemon, no
/// network, safe for concurrent readers via the connection mutex.
pub struct EmbeddedCache {
    conn: Mutex<Connection>,
}

impl EmbeddedCache {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv_store (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             CREATE TABLE IF NOT EXISTS hash_store (key TEXT NOT NULL, field TEXT NOT NULL, value TEXT NOT NULL, PRIMARY KEY (key, field));
             CREATE TABLE IF NOT EXISTS set_store (key TEXT NOT NULL, member TEXT NOT NULL, PRIMARY KEY (key, member));",
        )?;
        debug!(path = %path.display(), "opened embedded cache");
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE kv_store (key TEXT PRIMARY KEY, value TEXT NOT NULL);
             CREATE TABLE hash_store (key TEXT NOT NULL, field TEXT NOT NULL, value TEXT NOT NULL, PRIMARY KEY (key, field));
             CREATE TABLE set_store (key TEXT NOT NULL, member TEXT NOT NULL, PRIMARY KEY (key, member));",
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl MetadataCache for EmbeddedCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", params![key], |row| row.get(0))
            .optional()?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.conn.lock().execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.conn.lock().execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }

    fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key)?.is_some())
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM kv_store WHERE key LIKE ?1")?;
        let pattern = format!("{prefix}%");
        let rows = stmt.query_map(params![pattern], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(CacheError::from)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                "SELECT value FROM hash_store WHERE key = ?1 AND field = ?2",
                params![key, field],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        self.conn.lock().execute(
            "INSERT INTO hash_store (key, field, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
            params![key, field, value],
        )?;
        Ok(())
    }

    fn hset_mapping(&self, key: &str, mapping: &[(&str, &str)]) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        for (field, value) in mapping {
            conn.execute(
                "INSERT INTO hash_store (key, field, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key, field) DO UPDATE SET value = excluded.value",
                params![key, field, value],
            )?;
        }
        Ok(())
    }

    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT field, value FROM hash_store WHERE key = ?1")?;
        let rows = stmt.query_map(params![key], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(CacheError::from)
    }

    fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError> {
        self.conn
            .lock()
            .execute("DELETE FROM hash_store WHERE key = ?1 AND field = ?2", params![key, field])?;
        Ok(())
    }

    fn hkeys(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT field FROM hash_store WHERE key = ?1")?;
        let rows = stmt.query_map(params![key], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(CacheError::from)
    }

    fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.conn.lock().execute(
            "INSERT OR IGNORE INTO set_store (key, member) VALUES (?1, ?2)",
            params![key, member],
        )?;
        Ok(())
    }

    fn srem(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.conn
            .lock()
            .execute("DELETE FROM set_store WHERE key = ?1 AND member = ?2", params![key, member])?;
        Ok(())
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT member FROM set_store WHERE key = ?1")?;
        let rows = stmt.query_map(params![key], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(CacheError::from)
    }

    fn scard(&self, key: &str) -> Result<usize, CacheError> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM set_store WHERE key = ?1", params![key], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn ping(&self) -> Result<(), CacheError> {
        self.conn.lock().execute_batch("SELECT 1")?;
        Ok(())
    }
}
