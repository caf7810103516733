// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("sqlite backend error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("redis backend error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("failed to serialize cache value: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("cache key '{0}' holds a value of the wrong type")]
    WrongType(String),
}
