// SPDX-License-Identifier: MIT

//! Daemon startup: acquire the single-instance lock, open the configured
//! cache backend, wire the store and worker supervisor together, and bind
//! the client socket — in that order, so a failed bind never leaves a lock
//! file behind for the daemon that actually won the race.

use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bh_cache::{EmbeddedCache, MetadataCache, NetworkedCache};
use bh_core::{CacheBackendKind, Config};
use bh_store::BubbleStore;
use bh_worker::{Supervisor, WorkerSupervisor};
use fs2::FileExt;
use tokio::net::UnixListener;
use tokio::sync::Notify;
use tracing::info;

use crate::env;
use crate::error::DaemonError;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const CALL_TIMEOUT: Duration = Duration::from_secs(300);

pub struct Daemon {
    pub config: Config,
    pub store: Arc<BubbleStore>,
    pub supervisor: Arc<dyn WorkerSupervisor>,
    pub listener: UnixListener,
    pub start_time: Instant,
    pub shutdown_signal: Notify,
    _lock_file: std::fs::File,
}

pub fn startup(config: Config) -> Result<Daemon, DaemonError> {
    std::fs::create_dir_all(&config.base)?;
    std::fs::create_dir_all(config.bubbles_dir())?;

    let lock_path = config.pid_path();
    let lock_file = std::fs::OpenOptions::new().write(true).create(true).truncate(false).open(&lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(|source| DaemonError::LockFailed { path: lock_path.clone(), source })?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let cache: Arc<dyn MetadataCache> = match config.cache_backend {
        CacheBackendKind::Embedded => Arc::new(EmbeddedCache::open(&config.cache_db_path())?),
        CacheBackendKind::Networked => {
            let endpoint = config.cache_endpoint.clone().unwrap_or_default();
            Arc::new(NetworkedCache::connect(&endpoint)?)
        }
    };

    let store = Arc::new(BubbleStore::new(
        config.bubbles_dir(),
        config.base.join("pool"),
        config.build_lock_path(),
        cache,
    ));

    let supervisor: Arc<dyn WorkerSupervisor> = Arc::new(Supervisor::new(
        env::bootstrap_exe(),
        config.bubbles_dir(),
        config.main_site_dir.clone(),
        HANDSHAKE_TIMEOUT,
        CALL_TIMEOUT,
    ));

    if config.socket_path().exists() {
        std::fs::remove_file(config.socket_path())?;
    }
    let listener = UnixListener::bind(config.socket_path())
        .map_err(|source| DaemonError::BindFailed { path: config.socket_path(), source })?;

    let recovered = bh_loader::recover_stale_cloaks(&config.main_site_dir)?;
    if !recovered.is_empty() {
        tracing::warn!(count = recovered.len(), "recovered stale cloak entries left by a crashed prior run");
    }

    if let Some(reason) = bh_loader::check_corrupt(&config.main_site_dir) {
        tracing::warn!(reason, "main site left marked corrupt by a prior crash; serving anyway");
    }

    info!(base = %config.base.display(), "daemon started");
    Ok(Daemon {
        config,
        store,
        supervisor,
        listener,
        start_time: Instant::now(),
        shutdown_signal: Notify::new(),
        _lock_file: lock_file,
    })
}

impl Daemon {
    pub async fn shutdown(&self) {
        info!("shutting down");
        if let Err(e) = self.supervisor.shutdown_all().await {
            tracing::warn!(error = %e, "error stopping workers during shutdown");
        }
        if self.config.socket_path().exists() {
            let _ = std::fs::remove_file(self.config.socket_path());
        }
        if self.config.pid_path().exists() {
            let _ = std::fs::remove_file(self.config.pid_path());
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn startup_creates_directories_and_binds_socket() {
        let dir = tempdir().unwrap();
        let config = Config::defaults(dir.path().to_path_buf());

        let daemon = startup(config).unwrap();

        assert!(daemon.config.bubbles_dir().is_dir());
        assert!(daemon.config.socket_path().exists());
        assert!(daemon.config.pid_path().exists());
    }

    #[tokio::test]
    async fn startup_fails_without_disturbing_an_already_running_instance() {
        let dir = tempdir().unwrap();
        let config = Config::defaults(dir.path().to_path_buf());
        std::fs::create_dir_all(&config.base).unwrap();

        let lock_file =
            std::fs::OpenOptions::new().write(true).create(true).open(config.pid_path()).unwrap();
        lock_file.try_lock_exclusive().unwrap();
        std::fs::write(config.socket_path(), b"").unwrap();

        let err = startup(config.clone()).unwrap_err();
        assert!(matches!(err, DaemonError::LockFailed { .. }));

        // The running instance's own files must survive the failed attempt.
        assert!(config.socket_path().exists());
        assert!(config.pid_path().exists());
    }

    #[tokio::test]
    async fn startup_recovers_a_stale_cloak_left_by_a_crashed_prior_run() {
        let dir = tempdir().unwrap();
        let config = Config::defaults(dir.path().to_path_buf());
        std::fs::create_dir_all(&config.main_site_dir).unwrap();
        std::fs::create_dir_all(config.main_site_dir.join("numpy.bh-cloak-deadbeef")).unwrap();

        let daemon = startup(config).unwrap();

        assert!(daemon.config.main_site_dir.join("numpy").is_dir());
        assert!(!daemon.config.main_site_dir.join("numpy.bh-cloak-deadbeef").exists());
    }

    #[tokio::test]
    async fn startup_warns_but_still_serves_with_a_pre_existing_corrupt_marker() {
        let dir = tempdir().unwrap();
        let config = Config::defaults(dir.path().to_path_buf());
        std::fs::create_dir_all(&config.main_site_dir).unwrap();
        std::fs::write(config.main_site_dir.join(".bh-activation-corrupt"), "boom").unwrap();

        let daemon = startup(config).unwrap();

        assert!(daemon.config.socket_path().exists());
    }
}
