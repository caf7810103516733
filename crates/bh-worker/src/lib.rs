// SPDX-License-Identifier: MIT

//! Supervises one worker per `(package, version)` spec: a process-backed
//! backend for normal hosts, and a thread-backed fallback for hosts where
//! spawning per-spec child processes isn't viable.

mod error;
mod fallback;
mod handle;
mod mode;
mod supervisor;

use bh_core::Spec;
use bh_protocol::{Request, Response};

pub use error::SupervisorError;
pub use fallback::{InProcessExecutor, InProcessSupervisor};
pub use handle::WorkerHandle;
pub use mode::SupervisorMode;
pub use supervisor::Supervisor;

/// The dispatch surface both backends implement, so callers construct one
/// `Box<dyn WorkerSupervisor>` per [`SupervisorMode`] and never branch on
/// the mode again.
#[async_trait::async_trait]
pub trait WorkerSupervisor: Send + Sync {
    async fn dispatch(&self, spec: &Spec, request: Request) -> Result<Response, SupervisorError>;
    async fn shutdown(&self, spec: &Spec) -> Result<(), SupervisorError>;
    async fn shutdown_all(&self) -> Result<(), SupervisorError>;
    fn active_count(&self) -> usize;
}

#[async_trait::async_trait]
impl WorkerSupervisor for Supervisor {
    async fn dispatch(&self, spec: &Spec, request: Request) -> Result<Response, SupervisorError> {
        Supervisor::dispatch(self, spec, request).await
    }

    async fn shutdown(&self, spec: &Spec) -> Result<(), SupervisorError> {
        Supervisor::shutdown(self, spec).await
    }

    async fn shutdown_all(&self) -> Result<(), SupervisorError> {
        Supervisor::shutdown_all(self).await
    }

    fn active_count(&self) -> usize {
        Supervisor::active_count(self)
    }
}
