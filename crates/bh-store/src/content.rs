// SPDX-License-Identifier: MIT

//! The content-addressed blob pool bubbles link into. Two bubbles that
//! install the same wheel share the same inode via hardlink; storage
//! therefore grows with distinct file content, not with bubble count.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::StoreError;

pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn blob_path(&self, sha256: &str) -> PathBuf {
        self.root.join(&sha256[..2]).join(sha256)
    }

    /// Hashes `source` and copies it into the pool under its digest if not
    /// already present. Returns the digest and the pool path.
    pub fn ingest(&self, source: &Path) -> Result<(String, PathBuf), StoreError> {
        let bytes = fs_err::read(source).map_err(|e| StoreError::Io { path: source.to_path_buf(), source: e.into() })?;
        let digest = hex_sha256(&bytes);
        let dest = self.blob_path(&digest);
        if !dest.exists() {
            if let Some(parent) = dest.parent() {
                fs_err::create_dir_all(parent).map_err(|e| StoreError::Io { path: parent.to_path_buf(), source: e.into() })?;
            }
            let tmp = dest.with_extension("tmp");
            fs_err::copy(source, &tmp).map_err(|e| StoreError::Io { path: tmp.clone(), source: e.into() })?;
            fs_err::rename(&tmp, &dest).map_err(|e| StoreError::Io { path: dest.clone(), source: e.into() })?;
        }
        Ok((digest, dest))
    }

    /// Links `blob` into `dest`, falling back to a copy when hardlinking
    /// fails (cross-device pool, or a filesystem without hardlink support).
    pub fn link_into(&self, blob: &Path, dest: &Path) -> Result<bool, StoreError> {
        if let Some(parent) = dest.parent() {
            fs_err::create_dir_all(parent).map_err(|e| StoreError::Io { path: parent.to_path_buf(), source: e.into() })?;
        }
        match fs_err::hard_link(blob, dest) {
            Ok(()) => Ok(true),
            Err(_) => {
                fs_err::copy(blob, dest).map_err(|e| StoreError::Io { path: dest.to_path_buf(), source: e.into() })?;
                Ok(false)
            }
        }
    }
}

pub fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_same_content_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("pool"));
        let source = dir.path().join("a.txt");
        fs_err::write(&source, b"hello").unwrap();
        let (digest1, path1) = store.ingest(&source).unwrap();
        let (digest2, path2) = store.ingest(&source).unwrap();
        assert_eq!(digest1, digest2);
        assert_eq!(path1, path2);
    }

    #[test]
    fn link_into_hardlinks_when_possible() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::new(dir.path().join("pool"));
        let source = dir.path().join("a.txt");
        fs_err::write(&source, b"hello").unwrap();
        let (_digest, blob) = store.ingest(&source).unwrap();
        let dest = dir.path().join("bubble/a.txt");
        let hardlinked = store.link_into(&blob, &dest).unwrap();
        assert!(hardlinked);
        assert_eq!(fs_err::read(&dest).unwrap(), b"hello");
    }
}
