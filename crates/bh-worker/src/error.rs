// SPDX-License-Identifier: MIT

use bh_core::Spec;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("worker for {spec} failed to launch: {reason}")]
    LaunchFailed { spec: Spec, reason: String },

    #[error("worker for {spec} did not send its ready handshake within {timeout_s}s")]
    HandshakeTimeout { spec: Spec, timeout_s: u64 },

    #[error("worker for {spec} died: {reason}")]
    Died { spec: Spec, reason: String },

    #[error("request to {spec} timed out after {elapsed_s}s")]
    Timeout { spec: Spec, elapsed_s: u64 },

    #[error("protocol error talking to {0}: {1}")]
    Protocol(Spec, #[source] bh_protocol::ProtocolError),

    #[error("activation failed for {0}: {1}")]
    Activation(Spec, #[source] bh_loader::ActivationError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
