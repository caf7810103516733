// SPDX-License-Identifier: MIT

//! The `.build.lock` advisory lock serializes concurrent `bh build`
//! invocations against the same store so two builds never race to write the
//! same bubble directory.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::StoreError;

pub struct BuildLock {
    file: File,
    path: PathBuf,
}

impl BuildLock {
    /// Acquires the lock at `path`, failing fast rather than blocking: a
    /// held lock means another build is in flight, and bh-store has no
    /// notion of a build queue.
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| StoreError::Io { path: parent.to_path_buf(), source })?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|source| StoreError::Io { path: path.to_path_buf(), source })?;
        file.try_lock_exclusive().map_err(|_| StoreError::LockHeld(path.to_path_buf()))?;
        Ok(Self { file, path: path.to_path_buf() })
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".build.lock");
        let _first = BuildLock::acquire(&path).unwrap();
        let second = BuildLock::acquire(&path);
        assert!(matches!(second, Err(StoreError::LockHeld(_))));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".build.lock");
        {
            let _guard = BuildLock::acquire(&path).unwrap();
        }
        let _reacquired = BuildLock::acquire(&path).unwrap();
    }
}
