// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not connect to daemon at {socket_path}: {source}")]
    Connect { socket_path: String, source: std::io::Error },

    #[error("daemon did not start within {timeout_s}s of auto-start")]
    AutoStartTimeout { timeout_s: u64 },

    #[error("protocol error: {0}")]
    Protocol(#[from] bh_protocol::ProtocolError),

    #[error("request timed out after {elapsed_s}s")]
    Timeout { elapsed_s: u64 },

    #[error("daemon returned an unexpected response: {0:?}")]
    UnexpectedResponse(bh_protocol::Response),

    #[error("daemon reported an error: {message}")]
    Remote { message: String },
}
