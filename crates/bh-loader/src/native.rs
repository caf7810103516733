// SPDX-License-Identifier: MIT

//! The loader's one shipped [`ImportResolver`]: a child interpreter process
//! has no in-process module cache we can reach into, so this adapter
//! degenerates to managing the environment variables and metadata path
//! list the child reads at import time, plus an in-memory record of what
//! it believes is loaded.

use std::collections::HashSet;
use std::io;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::resolver::{ImportResolver, ModuleHandle};

pub struct NativeResolver {
    search_path: Mutex<Vec<PathBuf>>,
    metadata_path: Mutex<Vec<PathBuf>>,
    loaded_modules: Mutex<HashSet<String>>,
}

impl NativeResolver {
    pub fn new(initial_search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path: Mutex::new(initial_search_path),
            metadata_path: Mutex::new(Vec::new()),
            loaded_modules: Mutex::new(HashSet::new()),
        }
    }

    /// Records that the child process reported importing `module`; the
    /// bootstrap worker calls this after a successful `execute` so the
    /// next scope's snapshot diff knows what to purge on restore.
    pub fn record_loaded(&self, module: impl Into<String>) {
        self.loaded_modules.lock().insert(module.into());
    }
}

impl ImportResolver for NativeResolver {
    fn search_path(&self) -> Vec<PathBuf> {
        self.search_path.lock().clone()
    }

    fn set_search_path(&self, paths: Vec<PathBuf>) -> io::Result<()> {
        *self.search_path.lock() = paths;
        Ok(())
    }

    fn metadata_path(&self) -> Vec<PathBuf> {
        self.metadata_path.lock().clone()
    }

    fn set_metadata_path(&self, paths: Vec<PathBuf>) -> io::Result<()> {
        *self.metadata_path.lock() = paths;
        Ok(())
    }

    fn loaded_modules(&self) -> Vec<ModuleHandle> {
        self.loaded_modules.lock().iter().cloned().collect()
    }

    fn purge_modules(&self, names: &HashSet<String>) -> io::Result<()> {
        self.loaded_modules.lock().retain(|m| !names.contains(m));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_read_search_path_roundtrips() {
        let resolver = NativeResolver::new(vec![PathBuf::from("/main")]);
        assert_eq!(resolver.search_path(), vec![PathBuf::from("/main")]);
        resolver.set_search_path(vec![PathBuf::from("/bubbles/numpy-1.26.4")]).unwrap();
        assert_eq!(resolver.search_path(), vec![PathBuf::from("/bubbles/numpy-1.26.4")]);
    }

    #[test]
    fn record_loaded_then_purge() {
        let resolver = NativeResolver::new(vec![]);
        resolver.record_loaded("numpy");
        resolver.record_loaded("numpy.core");
        resolver.purge_modules(&["numpy".to_string()].into_iter().collect()).unwrap();
        assert_eq!(resolver.loaded_modules(), vec!["numpy.core".to_string()]);
    }
}
