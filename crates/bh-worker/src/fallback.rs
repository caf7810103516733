// SPDX-License-Identifier: MIT

//! The platform fallback for hosts where spawning a child process per spec
//! isn't viable, grounded on `windows_daemon_compat.py::WindowsFakeDaemon`:
//! each "worker" becomes a thread holding its own activation scope instead
//! of a subprocess, behind the same dispatch surface.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc as std_mpsc, Arc};
use std::thread::JoinHandle;

use bh_core::Spec;
use bh_loader::{ImportResolver, Scope};
use bh_protocol::{Request, Response};
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::info;

use crate::error::SupervisorError;
use crate::WorkerSupervisor;

/// Executes a request inside an already-activated scope. The host
/// application supplies this — `bh-worker` only owns the thread and scope
/// lifecycle, not the interpreter itself.
pub trait InProcessExecutor: Send + Sync + 'static {
    fn execute(&self, request: &Request) -> Response;
}

struct ThreadWorker {
    join: Option<JoinHandle<()>>,
    tx: std_mpsc::Sender<(Request, oneshot::Sender<Response>)>,
}

pub struct InProcessSupervisor<E: InProcessExecutor> {
    workers: Mutex<HashMap<Spec, ThreadWorker>>,
    resolver: Arc<dyn ImportResolver>,
    main_site_dir: PathBuf,
    bubbles_dir: PathBuf,
    executor: Arc<E>,
}

impl<E: InProcessExecutor> InProcessSupervisor<E> {
    pub fn new(resolver: Arc<dyn ImportResolver>, main_site_dir: PathBuf, bubbles_dir: PathBuf, executor: Arc<E>) -> Self {
        Self { workers: Mutex::new(HashMap::new()), resolver, main_site_dir, bubbles_dir, executor }
    }

    fn spawn_worker(&self, spec: &Spec) -> Result<ThreadWorker, SupervisorError> {
        let (tx, rx) = std_mpsc::channel::<(Request, oneshot::Sender<Response>)>();
        let resolver = self.resolver.clone();
        let bubble_root = self.bubbles_dir.join(spec.slug());
        let main_site_dir = self.main_site_dir.clone();
        let executor = self.executor.clone();
        let thread_spec = spec.clone();

        let join = std::thread::Builder::new()
            .name(format!("bh-inproc-{}", spec.slug()))
            .spawn(move || {
                let scope = match Scope::activate(resolver, &main_site_dir, &bubble_root, &[thread_spec.name.to_string()]) {
                    Ok(scope) => scope,
                    Err(e) => {
                        tracing::error!(worker = %thread_spec, error = %e, "in-process worker failed to activate");
                        return;
                    }
                };
                info!(worker = %thread_spec, "in-process worker ready");
                while let Ok((request, reply)) = rx.recv() {
                    let shutting_down = matches!(request, Request::Shutdown { .. });
                    let response = executor.execute(&request);
                    let _ = reply.send(response);
                    if shutting_down {
                        break;
                    }
                }
                drop(scope);
            })
            .map_err(|e| SupervisorError::LaunchFailed { spec: spec.clone(), reason: e.to_string() })?;

        Ok(ThreadWorker { join: Some(join), tx })
    }
}

#[async_trait::async_trait]
impl<E: InProcessExecutor> WorkerSupervisor for InProcessSupervisor<E> {
    async fn dispatch(&self, spec: &Spec, request: Request) -> Result<Response, SupervisorError> {
        let needs_spawn = !self.workers.lock().contains_key(spec);
        if needs_spawn {
            let worker = self.spawn_worker(spec)?;
            self.workers.lock().insert(spec.clone(), worker);
        }

        let tx = {
            let workers = self.workers.lock();
            workers.get(spec).expect("just inserted").tx.clone()
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send((request, reply_tx)).map_err(|_| SupervisorError::Died { spec: spec.clone(), reason: "worker thread gone".into() })?;
        reply_rx.await.map_err(|_| SupervisorError::Died { spec: spec.clone(), reason: "worker thread dropped reply".into() })
    }

    async fn shutdown(&self, spec: &Spec) -> Result<(), SupervisorError> {
        let worker = self.workers.lock().remove(spec);
        if let Some(mut worker) = worker {
            let (reply_tx, _reply_rx) = oneshot::channel();
            let _ = worker.tx.send((Request::Shutdown { force: false }, reply_tx));
            if let Some(join) = worker.join.take() {
                let _ = join.join();
            }
        }
        Ok(())
    }

    async fn shutdown_all(&self) -> Result<(), SupervisorError> {
        let specs: Vec<Spec> = self.workers.lock().keys().cloned().collect();
        for spec in specs {
            self.shutdown(&spec).await?;
        }
        Ok(())
    }

    fn active_count(&self) -> usize {
        self.workers.lock().len()
    }
}
