// SPDX-License-Identifier: MIT

//! On-disk and cache-resident records: what a bubble is, what a file inside
//! it looks like, and what the registry remembers about a running worker.

use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::spec::Spec;

/// A single file captured in a bubble's manifest, keyed by its path relative
/// to the bubble root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub relpath: PathBuf,
    pub sha256: String,
    pub size_bytes: u64,
    /// Set when the file was installed as a hardlink into the content store
    /// rather than copied; dedup accounting uses this to skip re-checksumming
    /// unchanged inodes on verify.
    pub hardlinked: bool,
}

/// A dependency captured alongside a bubble's primary spec, with the
/// constraint (if any) that pinned it there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub spec: Spec,
    pub constrained_by: Option<String>,
}

/// The durable record of a built bubble: what it contains and how it was
/// built. Persisted in the metadata cache under `pkg:<name>:<version>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BubbleRecord {
    pub spec: Spec,
    pub root: PathBuf,
    pub files: Vec<FileEntry>,
    pub dependency_closure: Vec<PackageRecord>,
    #[serde(with = "time_serde")]
    pub built_at: SystemTime,
}

impl BubbleRecord {
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    pub fn hardlinked_count(&self) -> usize {
        self.files.iter().filter(|f| f.hardlinked).count()
    }
}

/// A single rename performed by the activation loader while cloaking the
/// main-site install of a package, so the scope guard can restore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloakedEntry {
    pub original: PathBuf,
    pub cloaked: PathBuf,
    pub scope_token: String,
}

/// Liveness state the supervisor keeps for a spawned worker; not persisted,
/// rebuilt on daemon start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub spec: Spec,
    pub pid: u32,
    pub socket_path: Option<PathBuf>,
    pub ready: bool,
}

mod time_serde {
    use std::time::{SystemTime, UNIX_EPOCH};

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &SystemTime, s: S) -> Result<S::Ok, S::Error> {
        let secs = t
            .duration_since(UNIX_EPOCH)
            .map_err(serde::ser::Error::custom)?
            .as_secs();
        s.serialize_u64(secs)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<SystemTime, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use semver::Version;

    use super::*;

    fn sample_spec() -> Spec {
        Spec::new("numpy", Version::new(1, 26, 4))
    }

    #[test]
    fn totals_sum_file_sizes() {
        let record = BubbleRecord {
            spec: sample_spec(),
            root: PathBuf::from("/bubbles/numpy-1.26.4"),
            files: vec![
                FileEntry {
                    relpath: PathBuf::from("numpy/__init__.py"),
                    sha256: "a".repeat(64),
                    size_bytes: 120,
                    hardlinked: true,
                },
                FileEntry {
                    relpath: PathBuf::from("numpy/core/_multiarray.so"),
                    sha256: "b".repeat(64),
                    size_bytes: 88_000,
                    hardlinked: false,
                },
            ],
            dependency_closure: vec![],
            built_at: SystemTime::UNIX_EPOCH,
        };
        assert_eq!(record.total_bytes(), 88_120);
        assert_eq!(record.hardlinked_count(), 1);
    }

    #[test]
    fn built_at_roundtrips_through_json() {
        let record = BubbleRecord {
            spec: sample_spec(),
            root: PathBuf::from("/bubbles/numpy-1.26.4"),
            files: vec![],
            dependency_closure: vec![],
            built_at: std::time::UNIX_EPOCH + std::time::Duration::from_secs(1_700_000_000),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: BubbleRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record, back);
    }
}
