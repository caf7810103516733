// SPDX-License-Identifier: MIT

//! A single spawned `bh-worker-bootstrap` child process, with its own data
//! and log channels kept separate, matching the split `workers.py` used
//! between the interpreter's stdout-as-protocol-channel and its stderr log
//! stream.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use bh_core::Spec;
use bh_protocol::{Request, Response};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::SupervisorError;

pub struct WorkerHandle {
    spec: Spec,
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    data: Mutex<BufReader<tokio::process::ChildStdout>>,
}

impl WorkerHandle {
    /// Spawns `bootstrap_exe` for `spec`, waiting up to `handshake_timeout`
    /// for its `Response::Ready` before returning. `bubble_root` and
    /// `main_site_dir` are handed to the child verbatim; it activates its
    /// own `bh-loader::Scope` from them before sending the handshake.
    pub async fn spawn(
        spec: Spec,
        bootstrap_exe: &PathBuf,
        bubble_root: &PathBuf,
        main_site_dir: &PathBuf,
        handshake_timeout: Duration,
    ) -> Result<Self, SupervisorError> {
        let mut child = Command::new(bootstrap_exe)
            .arg(spec.to_string())
            .arg(bubble_root)
            .arg(main_site_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SupervisorError::LaunchFailed { spec: spec.clone(), reason: e.to_string() })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SupervisorError::LaunchFailed { spec: spec.clone(), reason: "no stdin handle".into() })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SupervisorError::LaunchFailed { spec: spec.clone(), reason: "no stdout handle".into() })?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SupervisorError::LaunchFailed { spec: spec.clone(), reason: "no stderr handle".into() })?;

        let log_spec = spec.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(worker = %log_spec, "{line}");
            }
        });

        let mut data = BufReader::new(stdout);
        let ready: Response = timeout(handshake_timeout, bh_protocol::read_message(&mut data))
            .await
            .map_err(|_| SupervisorError::HandshakeTimeout { spec: spec.clone(), timeout_s: handshake_timeout.as_secs() })?
            .map_err(|e| SupervisorError::Protocol(spec.clone(), e))?;
        if !matches!(ready, Response::Ready) {
            warn!(worker = %spec, ?ready, "unexpected first message from worker, expected Ready");
        }

        Ok(Self { spec, child: Mutex::new(child), stdin: Mutex::new(stdin), data: Mutex::new(data) })
    }

    /// Sends `request` and awaits its response. Requests to the same handle
    /// serialize through the stdin/data locks, giving FIFO ordering per
    /// worker without a separate queue.
    pub async fn dispatch(&self, request: &Request, per_call_timeout: Duration) -> Result<Response, SupervisorError> {
        let mut stdin = self.stdin.lock().await;
        let mut data = self.data.lock().await;

        let line = bh_protocol::encode(request).map_err(|e| SupervisorError::Protocol(self.spec.clone(), e))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(SupervisorError::Io)?;
        stdin.flush().await.map_err(SupervisorError::Io)?;

        timeout(per_call_timeout, bh_protocol::read_message(&mut *data))
            .await
            .map_err(|_| SupervisorError::Timeout { spec: self.spec.clone(), elapsed_s: per_call_timeout.as_secs() })?
            .map_err(|e| SupervisorError::Protocol(self.spec.clone(), e))
    }

    pub async fn is_alive(&self) -> bool {
        matches!(self.child.lock().await.try_wait(), Ok(None))
    }

    pub async fn kill(&self) -> Result<(), SupervisorError> {
        self.child.lock().await.start_kill().map_err(SupervisorError::Io)
    }
}

#[cfg(test)]
mod tests {
    // `WorkerHandle::spawn` requires a real bootstrap binary on disk, so its
    // behavior is covered by the cross-crate integration tests instead of a
    // unit test here.
}
