// SPDX-License-Identifier: MIT

//! The bubble store: builds package installs into content-deduplicated,
//! version-isolated directories and records what it built in the metadata
//! cache.

mod build;
mod constraints;
mod content;
mod error;
mod lock;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bh_cache::{keys, MetadataCache};
use bh_core::{BubbleRecord, PackageRecord, Spec};

pub use build::BubbleBuilder;
pub use constraints::{numpy_constraint_for, numpy_floor_for};
pub use content::ContentStore;
pub use error::StoreError;
pub use lock::BuildLock;

pub struct BubbleStore {
    builder: BubbleBuilder,
    cache: Arc<dyn MetadataCache>,
    lock_path: PathBuf,
}

impl BubbleStore {
    pub fn new(bubbles_dir: PathBuf, content_root: PathBuf, lock_path: PathBuf, cache: Arc<dyn MetadataCache>) -> Self {
        Self { builder: BubbleBuilder::new(bubbles_dir, content_root), cache, lock_path }
    }

    /// Builds `spec` from `source_root`, applying the numpy ABI constraint
    /// registry to `dependency_closure` before persisting the result.
    pub fn build(
        &self,
        spec: &Spec,
        source_root: &Path,
        mut dependency_closure: Vec<PackageRecord>,
    ) -> Result<BubbleRecord, StoreError> {
        let _lock = BuildLock::acquire(&self.lock_path)?;

        if let Some(req) = numpy_constraint_for(spec.name.as_str(), &spec.version) {
            match dependency_closure.iter_mut().find(|dep| dep.spec.name.as_str() == "numpy") {
                Some(numpy) => numpy.constrained_by = Some(req.to_string()),
                None => {
                    // The installer's closure omitted numpy outright; pin a
                    // synthetic entry at the constraint's own floor so the
                    // requirement still travels with the record.
                    if let Some(floor) = numpy_floor_for(spec.name.as_str(), &spec.version) {
                        dependency_closure.push(PackageRecord {
                            spec: Spec::new("numpy", floor),
                            constrained_by: Some(req.to_string()),
                        });
                    }
                }
            }
        }

        let record = self.builder.build(spec, source_root, dependency_closure)?;
        self.persist(&record)?;
        Ok(record)
    }

    pub fn verify(&self, spec: &Spec) -> Result<(), StoreError> {
        let record = self.load(spec)?;
        self.builder.verify(&record)
    }

    pub fn delete(&self, spec: &Spec) -> Result<(), StoreError> {
        self.builder.delete(spec)?;
        self.cache.delete(&keys::package_record(spec))?;
        self.cache.srem(&keys::package_versions(spec.name.as_str()), &spec.version.to_string())?;
        Ok(())
    }

    pub fn list(&self, name: &str) -> Result<Vec<String>, StoreError> {
        Ok(self.cache.smembers(&keys::package_versions(name))?)
    }

    pub fn load(&self, spec: &Spec) -> Result<BubbleRecord, StoreError> {
        let raw = self
            .cache
            .get(&keys::package_record(spec))?
            .ok_or_else(|| StoreError::NotInstalled { spec: spec.clone() })?;
        serde_json::from_str(&raw).map_err(|e| StoreError::CorruptRecord(spec.to_string(), e))
    }

    fn persist(&self, record: &BubbleRecord) -> Result<(), StoreError> {
        let raw = serde_json::to_string(record).map_err(|e| StoreError::CorruptRecord(record.spec.to_string(), e))?;
        self.cache.set(&keys::package_record(&record.spec), &raw)?;
        self.cache.sadd(&keys::package_versions(record.spec.name.as_str()), &record.spec.version.to_string())?;
        Ok(())
    }
}
