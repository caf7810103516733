// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bh_core::Spec;
use bh_protocol::{Request, Response};
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::error::ClientError;
use crate::launcher::{DaemonLauncher, NoAutoStart};

const DEFAULT_EXECUTE_TIMEOUT: Duration = Duration::from_secs(300);
const AUTO_START_SETTLE: Duration = Duration::from_millis(250);

/// Talks to the daemon over its Unix socket. A connection failure triggers
/// one auto-start-and-retry cycle through `launcher` before giving up.
pub struct DaemonClient {
    socket_path: PathBuf,
    launcher: Arc<dyn DaemonLauncher>,
    call_timeout: Duration,
}

impl DaemonClient {
    pub fn new(socket_path: PathBuf) -> Self {
        Self { socket_path, launcher: Arc::new(NoAutoStart), call_timeout: DEFAULT_EXECUTE_TIMEOUT }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn DaemonLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    async fn connect(&self) -> Result<UnixStream, ClientError> {
        match UnixStream::connect(&self.socket_path).await {
            Ok(stream) => Ok(stream),
            Err(first_err) => {
                warn!(error = %first_err, "daemon unreachable, attempting auto-start");
                self.launcher.start().map_err(|source| ClientError::Connect {
                    socket_path: self.socket_path.display().to_string(),
                    source,
                })?;
                sleep(AUTO_START_SETTLE).await;
                UnixStream::connect(&self.socket_path).await.map_err(|source| ClientError::Connect {
                    socket_path: self.socket_path.display().to_string(),
                    source,
                })
            }
        }
    }

    async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        let stream = self.connect().await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        timeout(self.call_timeout, bh_protocol::write_message(&mut write_half, request))
            .await
            .map_err(|_| ClientError::Timeout { elapsed_s: self.call_timeout.as_secs() })??;

        let response = timeout(self.call_timeout, bh_protocol::read_message(&mut reader))
            .await
            .map_err(|_| ClientError::Timeout { elapsed_s: self.call_timeout.as_secs() })??;

        if let Response::Error { message, .. } = &response {
            return Err(ClientError::Remote { message: message.clone() });
        }
        Ok(response)
    }

    fn reject<T>(response: Response) -> Result<T, ClientError> {
        Err(ClientError::UnexpectedResponse(response))
    }

    /// Runs `code` in the worker pinned to `spec`, returning its result
    /// value alongside everything it wrote to stdout while running.
    pub async fn execute(&self, spec: Spec, code: String, args: Vec<serde_json::Value>) -> Result<(serde_json::Value, String), ClientError> {
        match self.send(&Request::Execute { spec, code, args }).await? {
            Response::Success { value, stdout } => Ok((value, stdout)),
            other => Self::reject(other),
        }
    }

    /// Health-check ping; succeeds once the daemon's socket is up and
    /// accepting connections, before any spec has been dispatched.
    pub async fn hello(&self) -> Result<(), ClientError> {
        match self.send(&Request::Hello).await? {
            Response::Ready => Ok(()),
            other => Self::reject(other),
        }
    }

    /// Resolves `spec`'s installed version and the resolved module's file
    /// path, proving which bubble actually answered the request.
    pub async fn get_version(&self, spec: Spec) -> Result<(String, String), ClientError> {
        match self.send(&Request::GetVersion { spec }).await? {
            Response::Version { version, path } => Ok((version, path)),
            other => Self::reject(other),
        }
    }

    pub async fn status(&self) -> Result<(u64, usize, Option<String>), ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status { uptime_s, active_workers, main_site_corrupt } => {
                Ok((uptime_s, active_workers, main_site_corrupt))
            }
            other => Self::reject(other),
        }
    }

    pub async fn shutdown(&self, force: bool) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown { force }).await? {
            Response::ShuttingDown => Ok(()),
            other => Self::reject(other),
        }
    }
}
