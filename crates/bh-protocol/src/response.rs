// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// Sent from a worker or the daemon back to the caller over the data
/// channel. Log lines never appear here; those travel on the second stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// The worker's startup handshake: sent exactly once, before any
    /// request is accepted.
    Ready,

    /// `Request::Execute` completed; `value` is the callable's return value
    /// (or `null` for bare statements), `stdout` is everything the code
    /// wrote while it ran.
    Success { value: serde_json::Value, stdout: String },

    /// `Request::GetVersion` resolved: the version string and the resolved
    /// module's file path, proving which bubble actually answered.
    Version { version: String, path: String },

    /// The daemon's reply to `Request::Status`. `main_site_corrupt` carries
    /// the reason string left by a loader that crashed mid-activation, or
    /// `None` if the main site is clean.
    Status { uptime_s: u64, active_workers: usize, main_site_corrupt: Option<String> },

    /// A worker acknowledging a clean `Request::Shutdown`.
    ShuttingDown,

    /// Anything that isn't a successful result: a Python exception, a
    /// protocol violation, an unroutable spec.
    Error { message: String, traceback: Option<String> },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}
