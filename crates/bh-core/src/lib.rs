// SPDX-License-Identifier: MIT

//! Shared types for bubblehost: package identity, on-disk/cache records,
//! runtime configuration, and the error taxonomy every other crate in the
//! workspace builds on.

pub mod config;
pub mod error;
pub mod model;
pub mod spec;

pub use config::{CacheBackendKind, Config, ConfigError, InstallStrategy};
pub use error::{exit_code, BubbleError};
pub use model::{BubbleRecord, CloakedEntry, FileEntry, PackageRecord, WorkerRecord};
pub use spec::{PackageName, Spec, SpecParseError};
