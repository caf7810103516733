// SPDX-License-Identifier: MIT

//! The collaborator that knows how to start a daemon process; out of
//! scope for this crate's own responsibilities; modeled as a trait seam
//! so `DaemonClient` never shells out itself.
pub trait DaemonLauncher: Send + Sync {
    fn start(&self) -> std::io::Result<()>;
}

/// A launcher that does nothing; used when auto-start is disabled.
pub struct NoAutoStart;

impl DaemonLauncher for NoAutoStart {
    fn start(&self) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "auto-start is disabled"))
    }
}
