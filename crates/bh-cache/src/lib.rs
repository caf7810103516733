// SPDX-License-Identifier: MIT

//! A small polymorphic cache abstraction, grounded on the three structures
//! bubblehost actually needs: a string key/value store, hashes (per-bubble
//! metadata), and sets (version indices). Two backends implement it: an
//! embedded sqlite file for single-host use, and redis for a shared
//! metadata plane across hosts.

mod embedded;
pub mod keys;
mod networked;

mod error;

pub use embedded::EmbeddedCache;
pub use error::CacheError;
pub use networked::NetworkedCache;

/// The cache contract every backend satisfies. Neither backend supports
/// real transactions, so `pipeline` exists only for call-site parity with
/// backends that do — it returns `self` and batches nothing.
pub trait MetadataCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn set(&self, key: &str, value: &str) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
    fn exists(&self, key: &str) -> Result<bool, CacheError>;
    fn keys(&self, prefix: &str) -> Result<Vec<String>, CacheError>;

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>, CacheError>;
    fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError>;
    fn hset_mapping(&self, key: &str, mapping: &[(&str, &str)]) -> Result<(), CacheError>;
    fn hgetall(&self, key: &str) -> Result<Vec<(String, String)>, CacheError>;
    fn hdel(&self, key: &str, field: &str) -> Result<(), CacheError>;
    fn hkeys(&self, key: &str) -> Result<Vec<String>, CacheError>;

    fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError>;
    fn srem(&self, key: &str, member: &str) -> Result<(), CacheError>;
    fn smembers(&self, key: &str) -> Result<Vec<String>, CacheError>;
    fn scard(&self, key: &str) -> Result<usize, CacheError>;

    /// A no-op batching handle: neither backend supports real transactions,
    /// so every call through it commits immediately. Exists so call sites
    /// written against a transactional backend compile unchanged here.
    fn pipeline(&self) -> Pipeline<'_>
    where
        Self: Sized,
    {
        Pipeline { inner: self }
    }

    fn ping(&self) -> Result<(), CacheError>;
}

/// See [`MetadataCache::pipeline`].
pub struct Pipeline<'a> {
    inner: &'a dyn MetadataCache,
}

impl Pipeline<'_> {
    pub fn set(&self, key: &str, value: &str) -> Result<(), CacheError> {
        self.inner.set(key, value)
    }

    pub fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), CacheError> {
        self.inner.hset(key, field, value)
    }

    pub fn sadd(&self, key: &str, member: &str) -> Result<(), CacheError> {
        self.inner.sadd(key, member)
    }

    /// No-op: every method above already committed.
    pub fn execute(&self) -> Result<(), CacheError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_commits_immediately() {
        let cache = EmbeddedCache::open_in_memory().unwrap();
        let pipe = cache.pipeline();
        pipe.set("k", "v").unwrap();
        pipe.execute().unwrap();
        assert_eq!(cache.get("k").unwrap().as_deref(), Some("v"));
    }
}
