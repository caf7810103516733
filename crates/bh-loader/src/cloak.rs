// SPDX-License-Identifier: MIT

//! Cloaking hides a package's main-site install for the duration of a
//! scope by renaming it aside, so a child interpreter searching
//! `main_site_dir` before a bubble path can't resolve the wrong version.

use std::path::{Path, PathBuf};

use bh_core::CloakedEntry;
use tracing::{error, warn};

use crate::error::ActivationError;

const CLOAK_MARKER: &str = "bh-cloak";

fn cloaked_path(original: &Path, scope_token: &str) -> PathBuf {
    let name = original.file_name().and_then(|n| n.to_str()).unwrap_or("entry");
    original.with_file_name(format!("{name}.{CLOAK_MARKER}-{scope_token}"))
}

/// Renames `package_dir` (a main-site install directory or single-file
/// module) aside. Returns `None` if nothing was installed there to begin
/// with — cloaking an absent entry is not an error.
pub fn cloak(package_dir: &Path, scope_token: &str) -> Result<Option<CloakedEntry>, ActivationError> {
    if !package_dir.exists() {
        return Ok(None);
    }
    let cloaked = cloaked_path(package_dir, scope_token);
    fs_err::rename(package_dir, &cloaked)
        .map_err(|e| ActivationError::CloakFailed { path: package_dir.to_path_buf(), source: e.into() })?;
    Ok(Some(CloakedEntry {
        original: package_dir.to_path_buf(),
        cloaked,
        scope_token: scope_token.to_string(),
    }))
}

/// Reverses [`cloak`]. Failing to rename back is the one error that leaves
/// the main site in a state the loader can't silently recover from —
/// callers surface it as `ActivationError::ActivationCorrupt`.
pub fn uncloak(entry: &CloakedEntry) -> Result<(), ActivationError> {
    fs_err::rename(&entry.cloaked, &entry.original)
        .map_err(|e| ActivationError::UncloakFailed { path: entry.cloaked.clone(), source: e.into() })
}

/// Scans the immediate children of `main_site_dir` for entries a crashed
/// prior process left cloaked (the `.bh-cloak-<token>` suffix [`cloak`]
/// appends) and renames each one back to its original name. Run once at
/// daemon startup, before any new scope is activated, so a crash mid-PREPARING
/// or mid-RESTORING in a previous run doesn't leave a package permanently
/// hidden from the main site.
///
/// Returns the original paths it restored. Entries that can't be renamed
/// back are logged and skipped rather than aborting the whole scan — a
/// best-effort recovery still beats refusing to start.
pub fn recover_stale_cloaks(main_site_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut recovered = Vec::new();
    let entries = match std::fs::read_dir(main_site_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(recovered),
        Err(e) => return Err(e),
    };

    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let marker = format!(".{CLOAK_MARKER}-");
        let Some(marker_at) = name.find(&marker) else { continue };
        let original = path.with_file_name(&name[..marker_at]);

        if original.exists() {
            warn!(
                original = %original.display(),
                cloaked = %path.display(),
                "stale cloak found but its original path already exists, leaving cloak in place"
            );
            continue;
        }

        match fs_err::rename(&path, &original) {
            Ok(()) => recovered.push(original),
            Err(e) => error!(error = %e, cloaked = %path.display(), "failed to recover stale cloak entry"),
        }
    }

    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cloak_renames_and_uncloak_restores() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("numpy");
        std::fs::create_dir_all(&pkg).unwrap();
        std::fs::write(pkg.join("__init__.py"), b"# numpy").unwrap();

        let entry = cloak(&pkg, "tok1").unwrap().unwrap();
        assert!(!pkg.exists());
        assert!(entry.cloaked.exists());

        uncloak(&entry).unwrap();
        assert!(pkg.exists());
        assert!(!entry.cloaked.exists());
    }

    #[test]
    fn cloaking_absent_package_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let pkg = dir.path().join("not-installed");
        assert!(cloak(&pkg, "tok1").unwrap().is_none());
    }

    #[test]
    fn recover_stale_cloaks_renames_leftover_entries_back() {
        let dir = tempfile::tempdir().unwrap();
        let main_site = dir.path().join("main");
        std::fs::create_dir_all(&main_site).unwrap();
        let pkg = main_site.join("numpy");
        std::fs::create_dir_all(&pkg).unwrap();
        let entry = cloak(&pkg, "crashed-tok").unwrap().unwrap();
        assert!(!pkg.exists());

        let recovered = recover_stale_cloaks(&main_site).unwrap();
        assert_eq!(recovered, vec![pkg.clone()]);
        assert!(pkg.exists());
        assert!(!entry.cloaked.exists());
    }

    #[test]
    fn recover_stale_cloaks_on_a_missing_dir_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(recover_stale_cloaks(&missing).unwrap().is_empty());
    }

    #[test]
    fn recover_stale_cloaks_leaves_entry_in_place_if_original_already_exists() {
        let dir = tempfile::tempdir().unwrap();
        let main_site = dir.path().join("main");
        std::fs::create_dir_all(&main_site).unwrap();
        let pkg = main_site.join("numpy");
        std::fs::create_dir_all(&pkg).unwrap();
        let entry = cloak(&pkg, "tok").unwrap().unwrap();
        // Simulate something else having since recreated the original path.
        std::fs::create_dir_all(&pkg).unwrap();

        let recovered = recover_stale_cloaks(&main_site).unwrap();
        assert!(recovered.is_empty());
        assert!(entry.cloaked.exists());
    }

    #[test]
    fn distinct_scope_tokens_produce_distinct_cloak_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = cloaked_path(&dir.path().join("numpy"), "tok-a");
        let b = cloaked_path(&dir.path().join("numpy"), "tok-b");
        assert_ne!(a, b);
    }
}
