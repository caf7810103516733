// SPDX-License-Identifier: MIT

//! The seam between the loader's state machine and whatever runtime
//! actually owns an import search path. Rust has no dynamic module cache
//! of its own to hook, so the loader is written against a trait instead of
//! a concrete interpreter binding.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

/// A module name the resolver currently has cached/loaded.
pub type ModuleHandle = String;

pub trait ImportResolver: Send + Sync {
    fn search_path(&self) -> Vec<PathBuf>;
    fn set_search_path(&self, paths: Vec<PathBuf>) -> io::Result<()>;
    fn metadata_path(&self) -> Vec<PathBuf>;
    fn set_metadata_path(&self, paths: Vec<PathBuf>) -> io::Result<()>;
    fn loaded_modules(&self) -> Vec<ModuleHandle>;
    fn purge_modules(&self, names: &HashSet<String>) -> io::Result<()>;
}

/// A snapshot of everything a [`Scope`] needs to restore an
/// [`ImportResolver`] to its prior state, captured before any mutation.
#[derive(Debug, Clone, Default)]
pub struct ResolverSnapshot {
    pub search_path: Vec<PathBuf>,
    pub metadata_path: Vec<PathBuf>,
    pub loaded_modules: HashSet<String>,
}

impl ResolverSnapshot {
    pub fn capture(resolver: &dyn ImportResolver) -> Self {
        Self {
            search_path: resolver.search_path(),
            metadata_path: resolver.metadata_path(),
            loaded_modules: resolver.loaded_modules().into_iter().collect(),
        }
    }

    pub fn restore(&self, resolver: &dyn ImportResolver) -> io::Result<()> {
        resolver.set_search_path(self.search_path.clone())?;
        resolver.set_metadata_path(self.metadata_path.clone())?;
        let now: HashSet<String> = resolver.loaded_modules().into_iter().collect();
        let introduced: HashSet<String> = now.difference(&self.loaded_modules).cloned().collect();
        resolver.purge_modules(&introduced)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeResolver {
        search: Mutex<Vec<PathBuf>>,
        metadata: Mutex<Vec<PathBuf>>,
        loaded: Mutex<Vec<String>>,
    }

    impl ImportResolver for FakeResolver {
        fn search_path(&self) -> Vec<PathBuf> {
            self.search.lock().unwrap().clone()
        }
        fn set_search_path(&self, paths: Vec<PathBuf>) -> io::Result<()> {
            *self.search.lock().unwrap() = paths;
            Ok(())
        }
        fn metadata_path(&self) -> Vec<PathBuf> {
            self.metadata.lock().unwrap().clone()
        }
        fn set_metadata_path(&self, paths: Vec<PathBuf>) -> io::Result<()> {
            *self.metadata.lock().unwrap() = paths;
            Ok(())
        }
        fn loaded_modules(&self) -> Vec<ModuleHandle> {
            self.loaded.lock().unwrap().clone()
        }
        fn purge_modules(&self, names: &HashSet<String>) -> io::Result<()> {
            self.loaded.lock().unwrap().retain(|m| !names.contains(m));
            Ok(())
        }
    }

    #[test]
    fn restore_purges_only_newly_loaded_modules() {
        let resolver = FakeResolver::default();
        resolver.set_search_path(vec![PathBuf::from("/main")]).unwrap();
        *resolver.loaded.lock().unwrap() = vec!["sys".to_string()];
        let snapshot = ResolverSnapshot::capture(&resolver);

        resolver.set_search_path(vec![PathBuf::from("/bubbles/numpy-1.26.4")]).unwrap();
        resolver.loaded.lock().unwrap().push("numpy".to_string());

        snapshot.restore(&resolver).unwrap();
        assert_eq!(resolver.search_path(), vec![PathBuf::from("/main")]);
        assert_eq!(resolver.loaded_modules(), vec!["sys".to_string()]);
    }
}
