// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bh_core::Spec;
use bh_protocol::{Request, Response};
use dashmap::DashMap;
use tracing::{info, warn};

use crate::error::SupervisorError;
use crate::handle::WorkerHandle;

/// Owns one [`WorkerHandle`] per spec currently in use, spawning new workers
/// on first dispatch and routing subsequent requests to the existing one.
pub struct Supervisor {
    workers: DashMap<Spec, Arc<WorkerHandle>>,
    bootstrap_exe: PathBuf,
    bubbles_dir: PathBuf,
    main_site_dir: PathBuf,
    handshake_timeout: Duration,
    call_timeout: Duration,
}

impl Supervisor {
    pub fn new(
        bootstrap_exe: PathBuf,
        bubbles_dir: PathBuf,
        main_site_dir: PathBuf,
        handshake_timeout: Duration,
        call_timeout: Duration,
    ) -> Self {
        Self { workers: DashMap::new(), bootstrap_exe, bubbles_dir, main_site_dir, handshake_timeout, call_timeout }
    }

    async fn worker_for(&self, spec: &Spec) -> Result<Arc<WorkerHandle>, SupervisorError> {
        if let Some(handle) = self.workers.get(spec) {
            if handle.is_alive().await {
                return Ok(handle.clone());
            }
            warn!(worker = %spec, "existing worker is dead, respawning");
            self.workers.remove(spec);
        }

        let bubble_root = self.bubbles_dir.join(spec.slug());
        let handle = Arc::new(
            WorkerHandle::spawn(
                spec.clone(),
                &self.bootstrap_exe,
                &bubble_root,
                &self.main_site_dir,
                self.handshake_timeout,
            )
            .await?,
        );
        self.workers.insert(spec.clone(), handle.clone());
        info!(worker = %spec, "worker ready");
        Ok(handle)
    }

    /// Dispatches `request` to the worker for `spec`, spawning one if none
    /// exists yet. A worker that dies mid-request is evicted and the
    /// request retried exactly once against a freshly spawned worker; a
    /// second failure surfaces to the caller.
    pub async fn dispatch(&self, spec: &Spec, request: Request) -> Result<Response, SupervisorError> {
        let handle = self.worker_for(spec).await?;
        match handle.dispatch(&request, self.call_timeout).await {
            Ok(response) => Ok(response),
            Err(e) if Self::indicates_death(&e) => {
                warn!(worker = %spec, error = %e, "worker died mid-request, evicting and retrying once");
                self.workers.remove(spec);
                let fresh = self.worker_for(spec).await?;
                fresh.dispatch(&request, self.call_timeout).await
            }
            Err(e) => Err(e),
        }
    }

    /// Whether `err` reflects the worker process itself being gone, as
    /// opposed to a timeout or a malformed message the worker is still
    /// alive to answer for.
    fn indicates_death(err: &SupervisorError) -> bool {
        matches!(
            err,
            SupervisorError::Died { .. }
                | SupervisorError::Io(_)
                | SupervisorError::Protocol(_, bh_protocol::ProtocolError::Closed)
        )
    }

    pub async fn shutdown(&self, spec: &Spec) -> Result<(), SupervisorError> {
        if let Some((_, handle)) = self.workers.remove(spec) {
            let _ = handle.dispatch(&Request::Shutdown { force: false }, self.call_timeout).await;
            handle.kill().await?;
        }
        Ok(())
    }

    pub async fn shutdown_all(&self) -> Result<(), SupervisorError> {
        let specs: Vec<Spec> = self.workers.iter().map(|e| e.key().clone()).collect();
        for spec in specs {
            self.shutdown(&spec).await?;
        }
        Ok(())
    }

    pub fn active_count(&self) -> usize {
        self.workers.len()
    }
}
