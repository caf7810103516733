// SPDX-License-Identifier: MIT

use parking_lot::Mutex;
use redis::Commands;
use tracing::debug;

use crate::{CacheError, MetadataCache};

/// A redis-backed cache shared by every host in a fleet, trading the
/// embedded backend's zero-setup for a metadata plane other hosts can see.
pub struct NetworkedCache {
    conn: Mutex<redis::Connection>,
}

impl NetworkedCache {
    pub fn connect(endpoint: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(endpoint)?;
        let conn = client.get_connection()?;
        debug!(endpoint, "connected to redis cache backend");
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl MetadataCache for NetworkedCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.conn.lock().get(key)?)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        Ok(self.conn.lock().set(key, value)?)
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        Ok(self.conn.lock().del(key)?)
    }

    fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.conn.lock().exists(key)?)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.conn.lock().keys(format!("{prefix}*"))?)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError> {
        Ok(self.conn.lock().hget(key, field)?)
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        Ok(self.conn.lock().hset(key, field, value)?)
    }

    fn hset_mapping(&self, key: &str, mapping: &[(&str, &str)]) -> Result<(), CacheError> {
        Ok(self.conn.lock().hset_multiple(key, mapping)?)
    }

    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, CacheError> {
        Ok(self.conn.lock().hgetall(key)?)
    }

    fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError> {
        Ok(self.conn.lock().hdel(key, field)?)
    }

    fn hkeys(&self, key: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.conn.lock().hkeys(key)?)
    }

    fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError> {
        Ok(self.conn.lock().sadd(key, member)?)
    }

    fn srem(&self, key: &str, member: &str) -> Result<(), CacheError> {
        Ok(self.conn.lock().srem(key, member)?)
    }

    fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError> {
        Ok(self.conn.lock().smembers(key)?)
    }

    fn scard(&self, key: &str) -> Result<usize, CacheError> {
        Ok(self.conn.lock().scard(key)?)
    }

    fn ping(&self) -> Result<(), CacheError> {
        let _: String = redis::cmd("PING").query(&mut *self.conn.lock())?;
        Ok(())
    }
}
