// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use bh_core::{BubbleRecord, FileEntry, PackageRecord, Spec};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::content::ContentStore;
use crate::error::StoreError;

/// Builds bubbles into `bubbles_dir`, deduplicating file content through a
/// shared [`ContentStore`].
pub struct BubbleBuilder {
    bubbles_dir: PathBuf,
    content: ContentStore,
}

impl BubbleBuilder {
    pub fn new(bubbles_dir: PathBuf, content_root: PathBuf) -> Self {
        Self { bubbles_dir, content: ContentStore::new(content_root) }
    }

    pub fn bubble_root(&self, spec: &Spec) -> PathBuf {
        self.bubbles_dir.join(spec.slug())
    }

    fn tmp_root(&self, spec: &Spec) -> PathBuf {
        self.bubbles_dir.join(format!(".tmp-{}", spec.slug()))
    }

    /// Copies `source_root`'s tree into a fresh bubble for `spec`,
    /// deduplicating through the content store and installing under a
    /// scratch directory before an atomic rename into place. Any `.tmp-*`
    /// remnant from a previously crashed build for this spec is removed
    /// first, so a half-built bubble never masquerades as a finished one.
    pub fn build(
        &self,
        spec: &Spec,
        source_root: &Path,
        dependency_closure: Vec<PackageRecord>,
    ) -> Result<BubbleRecord, StoreError> {
        let tmp_root = self.tmp_root(spec);
        if tmp_root.exists() {
            warn!(spec = %spec, path = %tmp_root.display(), "removing stale build remnant");
            fs_err::remove_dir_all(&tmp_root).map_err(|e| StoreError::Io { path: tmp_root.clone(), source: e.into() })?;
        }
        fs_err::create_dir_all(&tmp_root).map_err(|e| StoreError::Io { path: tmp_root.clone(), source: e.into() })?;

        let mut files = Vec::new();
        for entry in WalkDir::new(source_root).into_iter() {
            let entry = entry.map_err(|e| StoreError::BuildFailed { spec: spec.clone(), reason: e.to_string() })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relpath = entry
                .path()
                .strip_prefix(source_root)
                .map_err(|e| StoreError::BuildFailed { spec: spec.clone(), reason: e.to_string() })?
                .to_path_buf();
            let (sha256, blob) = self.content.ingest(entry.path())?;
            let dest = tmp_root.join(&relpath);
            let hardlinked = self.content.link_into(&blob, &dest)?;
            let size_bytes = entry
                .metadata()
                .map_err(|e| StoreError::BuildFailed { spec: spec.clone(), reason: e.to_string() })?
                .len();
            files.push(FileEntry { relpath, sha256, size_bytes, hardlinked });
        }

        let final_root = self.bubble_root(spec);
        if final_root.exists() {
            fs_err::remove_dir_all(&final_root).map_err(|e| StoreError::Io { path: final_root.clone(), source: e.into() })?;
        }
        fs_err::rename(&tmp_root, &final_root).map_err(|e| StoreError::Io { path: final_root.clone(), source: e.into() })?;

        info!(spec = %spec, files = files.len(), "built bubble");
        Ok(BubbleRecord {
            spec: spec.clone(),
            root: final_root,
            files,
            dependency_closure,
            built_at: SystemTime::now(),
        })
    }

    /// Re-hashes every non-hardlinked file against the manifest; hardlinked
    /// files share an inode with the content store and cannot drift, so
    /// they're trusted without re-reading.
    pub fn verify(&self, record: &BubbleRecord) -> Result<(), StoreError> {
        for file in &record.files {
            if file.hardlinked {
                continue;
            }
            let path = record.root.join(&file.relpath);
            let bytes = fs_err::read(&path).map_err(|e| StoreError::Io { path: path.clone(), source: e.into() })?;
            let actual = crate::content::hex_sha256(&bytes);
            if actual != file.sha256 {
                return Err(StoreError::ChecksumMismatch {
                    relpath: file.relpath.clone(),
                    expected: file.sha256.clone(),
                    found: actual,
                });
            }
        }
        Ok(())
    }

    pub fn delete(&self, spec: &Spec) -> Result<(), StoreError> {
        let root = self.bubble_root(spec);
        if root.exists() {
            fs_err::remove_dir_all(&root).map_err(|e| StoreError::Io { path: root, source: e.into() })?;
        }
        Ok(())
    }
}
