// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use bh_core::Spec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{spec} is not installed")]
    NotInstalled { spec: Spec },

    #[error("build for {spec} failed: {reason}")]
    BuildFailed { spec: Spec, reason: String },

    #[error("another build is already in progress (lock held at {0})")]
    LockHeld(PathBuf),

    #[error("checksum mismatch for {relpath}: expected {expected}, found {found}")]
    ChecksumMismatch { relpath: PathBuf, expected: String, found: String },

    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("cache backend error: {0}")]
    Cache(#[from] bh_cache::CacheError),

    #[error("metadata record for {0} was malformed: {1}")]
    CorruptRecord(String, #[source] serde_json::Error),
}
