// SPDX-License-Identifier: MIT

//! Shared harness for the workspace-level daemon specs: locates the `bhd`
//! binary next to this test binary, starts it against a fresh `BH_BASE_DIR`,
//! and waits for its socket to appear before handing back a client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bh_client::DaemonClient;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::sleep;

const SOCKET_WAIT_MAX_MS: u64 = 5_000;
const SOCKET_POLL_INTERVAL_MS: u64 = 25;

/// The activation-corrupt marker file name `bh-loader` writes; not exported
/// by that crate since it's meant to be opaque to everyone but the loader
/// itself and an operator reading the file directly, so the specs here
/// reproduce it rather than reach into loader internals.
const CORRUPT_MARKER_FILE: &str = ".bh-activation-corrupt";

pub struct Daemon {
    child: Child,
    base: TempDir,
}

impl Daemon {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_base| {}).await
    }

    /// Starts a daemon over a base dir that already carries an
    /// activation-corrupt marker, as if a prior worker crashed mid-restore.
    pub async fn spawn_dirty() -> Self {
        Self::spawn_with(|base| {
            let main = base.join("main");
            std::fs::create_dir_all(&main).unwrap();
            std::fs::write(
                main.join(CORRUPT_MARKER_FILE),
                "rename of uncloaked entry failed during restore",
            )
            .unwrap();
        })
        .await
    }

    async fn spawn_with(seed: impl FnOnce(&Path)) -> Self {
        let base = TempDir::new().expect("tempdir");
        seed(base.path());

        let child = Command::new(assert_cmd::cargo::cargo_bin("bhd"))
            .env("BH_BASE_DIR", base.path())
            .env("BH_WORKER_BOOTSTRAP", assert_cmd::cargo::cargo_bin("bh-worker-bootstrap"))
            .env("RUST_LOG", "bh_daemon=debug")
            .spawn()
            .expect("bhd should spawn");

        let daemon = Daemon { child, base };
        daemon.wait_for_socket().await;
        daemon
    }

    async fn wait_for_socket(&self) {
        let deadline = Duration::from_millis(SOCKET_WAIT_MAX_MS);
        let step = Duration::from_millis(SOCKET_POLL_INTERVAL_MS);
        let mut waited = Duration::ZERO;
        while !self.socket_path().exists() {
            assert!(waited < deadline, "bhd never created its socket at {}", self.socket_path().display());
            sleep(step).await;
            waited += step;
        }
    }

    pub fn socket_path(&self) -> PathBuf {
        self.base.path().join("bubblehost.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.base.path().join("bubblehost.pid")
    }

    pub fn client(&self) -> DaemonClient {
        DaemonClient::new(self.socket_path())
    }

    /// A second `bhd` pointed at the same base dir, left for the caller to
    /// wait on; used to exercise the single-instance lock.
    pub fn spawn_sibling(&self) -> Child {
        Command::new(assert_cmd::cargo::cargo_bin("bhd"))
            .env("BH_BASE_DIR", self.base.path())
            .env("BH_WORKER_BOOTSTRAP", assert_cmd::cargo::cargo_bin("bh-worker-bootstrap"))
            .spawn()
            .expect("bhd should spawn")
    }

    pub async fn shutdown(mut self) {
        let _ = self.client().shutdown(false).await;
        let _ = tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await;
    }
}
