// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("failed to cloak {path}: {source}")]
    CloakFailed { path: PathBuf, source: std::io::Error },

    #[error("failed to restore {path} from its cloak: {source}")]
    UncloakFailed { path: PathBuf, source: std::io::Error },

    #[error("failed to update resolver state: {0}")]
    ResolverFailed(#[from] std::io::Error),

    /// A previous scope's restore step failed and left the main site in an
    /// indeterminate state; refuses to activate until cleared out of band.
    #[error("activation state for {main_site_dir} is corrupt: {reason}")]
    ActivationCorrupt { main_site_dir: PathBuf, reason: String },
}
