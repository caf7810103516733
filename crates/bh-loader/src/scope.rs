// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use bh_core::CloakedEntry;
use tracing::{error, warn};

use crate::cloak::{cloak, uncloak};
use crate::error::ActivationError;
use crate::resolver::{ImportResolver, ResolverSnapshot};

const CORRUPT_MARKER: &str = ".bh-activation-corrupt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    Preparing,
    Active,
    Restoring,
    Done,
    Corrupt,
}

fn corrupt_marker_path(main_site_dir: &Path) -> PathBuf {
    main_site_dir.join(CORRUPT_MARKER)
}

/// Returns the reason a previous scope's restore failed, if one did, so
/// callers refuse to activate on top of an indeterminate main site.
pub fn check_corrupt(main_site_dir: &Path) -> Option<String> {
    std::fs::read_to_string(corrupt_marker_path(main_site_dir)).ok()
}

/// Clears a corruption marker once an operator has manually verified and
/// repaired the main site.
pub fn clear_corrupt(main_site_dir: &Path) -> std::io::Result<()> {
    let path = corrupt_marker_path(main_site_dir);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

fn mark_corrupt(main_site_dir: &Path, reason: &str) {
    if let Err(e) = std::fs::write(corrupt_marker_path(main_site_dir), reason) {
        error!(error = %e, "failed to persist activation-corrupt marker, state is untracked");
    }
}

/// Unwinds a partially-prepared scope: un-cloaks every entry collected so
/// far and restores the resolver to its pre-activation snapshot, in reverse
/// order of how `activate` applied them. Used when a later step in PREPARING
/// fails, so a rejected activation never leaves the main site half-cloaked.
fn rollback(cloaked: Vec<CloakedEntry>, resolver: &Arc<dyn ImportResolver>, snapshot: &ResolverSnapshot, main_site_dir: &Path) {
    let mut failed = false;

    for entry in cloaked.into_iter().rev() {
        if let Err(e) = uncloak(&entry) {
            error!(error = %e, original = %entry.original.display(), "failed to restore cloaked entry during rollback");
            failed = true;
        }
    }

    if let Err(e) = snapshot.restore(&**resolver) {
        error!(error = %e, "failed to restore resolver snapshot during rollback");
        failed = true;
    }

    if failed {
        mark_corrupt(main_site_dir, "scope activation failed and rollback could not fully restore prior state");
    }
}

/// An RAII activation window: while alive, `resolver`'s search and metadata
/// paths point into the bubble for `package_names` ahead of the main site,
/// whose own installs of those packages are cloaked aside. Dropping it
/// restores the prior paths and un-cloaks the main site, in that order.
///
/// `!Send` by construction (via the embedded `Rc`): a scope's cloak set is
/// only ever correct for the thread that opened it.
#[must_use]
pub struct Scope {
    resolver: Arc<dyn ImportResolver>,
    snapshot: ResolverSnapshot,
    cloaked: Vec<CloakedEntry>,
    main_site_dir: PathBuf,
    state: ScopeState,
    _not_send: Rc<()>,
}

impl Scope {
    pub fn activate(
        resolver: Arc<dyn ImportResolver>,
        main_site_dir: &Path,
        bubble_root: &Path,
        package_names: &[String],
    ) -> Result<Self, ActivationError> {
        if let Some(reason) = check_corrupt(main_site_dir) {
            return Err(ActivationError::ActivationCorrupt { main_site_dir: main_site_dir.to_path_buf(), reason });
        }

        let snapshot = ResolverSnapshot::capture(&*resolver);

        let mut cloaked = Vec::new();
        let scope_token = nanoid::nanoid!(8);
        for name in package_names {
            let package_dir = main_site_dir.join(name);
            match cloak(&package_dir, &scope_token) {
                Ok(Some(entry)) => cloaked.push(entry),
                Ok(None) => {}
                Err(e) => {
                    rollback(cloaked, &resolver, &snapshot, main_site_dir);
                    return Err(e);
                }
            }
        }

        let mut search_path = vec![bubble_root.to_path_buf()];
        search_path.extend(snapshot.search_path.clone());
        if let Err(e) = resolver.set_search_path(search_path) {
            rollback(cloaked, &resolver, &snapshot, main_site_dir);
            return Err(ActivationError::ResolverFailed(e));
        }

        let mut metadata_path = vec![bubble_root.to_path_buf()];
        metadata_path.extend(snapshot.metadata_path.clone());
        if let Err(e) = resolver.set_metadata_path(metadata_path) {
            rollback(cloaked, &resolver, &snapshot, main_site_dir);
            return Err(ActivationError::ResolverFailed(e));
        }

        Ok(Self {
            resolver,
            snapshot,
            cloaked,
            main_site_dir: main_site_dir.to_path_buf(),
            state: ScopeState::Active,
            _not_send: Rc::new(()),
        })
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.state = ScopeState::Restoring;
        let mut failed = false;

        for entry in self.cloaked.drain(..).rev() {
            if let Err(e) = uncloak(&entry) {
                error!(error = %e, original = %entry.original.display(), "failed to restore cloaked entry");
                failed = true;
            }
        }

        if let Err(e) = self.snapshot.restore(&*self.resolver) {
            error!(error = %e, "failed to restore resolver snapshot");
            failed = true;
        }

        if failed {
            self.state = ScopeState::Corrupt;
            mark_corrupt(&self.main_site_dir, "scope restore failed, see daemon logs for the failing step");
        } else {
            self.state = ScopeState::Done;
            if check_corrupt(&self.main_site_dir).is_some() {
                warn!("scope restored cleanly but a prior corrupt marker is still present");
            }
        }
    }
}
