// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine a base directory: set BH_BASE_DIR or HOME")]
    NoBaseDir,

    #[error("failed to acquire daemon lock at {path}: another daemon is likely running")]
    LockFailed { path: PathBuf, #[source] source: std::io::Error },

    #[error("failed to bind socket at {path}: {source}")]
    BindFailed { path: PathBuf, #[source] source: std::io::Error },

    #[error("cache backend error: {0}")]
    Cache(#[from] bh_cache::CacheError),

    #[error("config error: {0}")]
    Config(#[from] bh_core::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
