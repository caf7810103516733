// SPDX-License-Identifier: MIT

//! Accepts one client connection per request: the client stub opens a fresh
//! socket for each call, so there's no per-connection session state to keep
//! beyond the single request/response round trip.

use std::sync::Arc;

use bh_protocol::{ProtocolError, Request, Response};
use bh_worker::WorkerSupervisor;
use tokio::io::BufReader;
use tokio::net::UnixStream;
use tracing::{debug, error, info, warn};

use crate::lifecycle::Daemon;

pub async fn run(daemon: Arc<Daemon>) {
    loop {
        tokio::select! {
            accepted = daemon.listener.accept() => {
                match accepted {
                    Ok((stream, _addr)) => {
                        let daemon = daemon.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &daemon).await {
                                warn!(error = %e, "connection error");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "accept error"),
                }
            }
            _ = daemon.shutdown_signal.notified() => {
                info!("stopping listener");
                break;
            }
        }
    }
}

async fn handle_connection(stream: UnixStream, daemon: &Daemon) -> Result<(), ProtocolError> {
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let request = bh_protocol::read_request(&mut reader).await?;
    debug!(?request, "received request");

    let is_shutdown = matches!(request, Request::Shutdown { .. });
    let response = handle_request(daemon, request).await;
    bh_protocol::write_response(&mut write_half, &response).await?;

    if is_shutdown {
        daemon.shutdown_signal.notify_one();
    }
    Ok(())
}

async fn handle_request(daemon: &Daemon, request: Request) -> Response {
    match &request {
        Request::Hello => Response::Ready,

        Request::Status => Response::Status {
            uptime_s: daemon.start_time.elapsed().as_secs(),
            active_workers: daemon.supervisor.active_count(),
            main_site_corrupt: bh_loader::check_corrupt(&daemon.config.main_site_dir),
        },

        Request::Execute { spec, .. } | Request::GetVersion { spec } => {
            if let Err(e) = daemon.store.load(spec) {
                return Response::Error { message: e.to_string(), traceback: None };
            }
            match daemon.supervisor.dispatch(spec, request.clone()).await {
                Ok(response) => response,
                Err(e) => Response::Error { message: e.to_string(), traceback: None },
            }
        }

        Request::Shutdown { .. } => Response::ShuttingDown,
    }
}
