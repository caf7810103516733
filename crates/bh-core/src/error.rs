// SPDX-License-Identifier: MIT

//! The top-level error taxonomy, composed from the per-crate error enums,
//! and its mapping onto process exit codes.

use thiserror::Error;

/// Every way a bubblehost operation can fail, spanning build, activation,
/// and worker-dispatch concerns. Each variant's doc comment records the
/// exit code it maps to.
#[derive(Debug, Error)]
pub enum BubbleError {
    /// Exit 2: the caller gave us a spec we can't even parse.
    #[error("invalid spec: {0}")]
    SpecInvalid(String),

    /// Exit 1: the spec is well-formed but nothing has built it yet.
    #[error("{spec} is not installed")]
    NotInstalled { spec: String },

    /// Exit 1: the bubble build itself failed (installer subprocess, missing
    /// wheel, checksum mismatch).
    #[error("build failed for {spec}: {reason}")]
    BuildFailed { spec: String, reason: String },

    /// Exit 3: the metadata cache backend is unreachable or returned a
    /// malformed record.
    #[error("cache backend error: {0}")]
    CacheBackendError(String),

    /// Exit 1: cloaking or restoring the main site failed mid-scope.
    #[error("activation failed for {spec}: {reason}")]
    ActivationFailed { spec: String, reason: String },

    /// Exit 3: a scope guard detected the main site was left in a
    /// partially-cloaked state by a previous, non-clean exit.
    #[error("activation state corrupt: {0}")]
    ActivationCorrupt(String),

    /// Exit 3: the worker subprocess never produced its ready handshake.
    #[error("worker for {spec} failed to launch: {reason}")]
    WorkerLaunchFailed { spec: String, reason: String },

    /// Exit 3: a previously healthy worker's process exited unexpectedly.
    #[error("worker for {spec} died: {reason}")]
    WorkerDied { spec: String, reason: String },

    /// Exit 3: a request to a worker exceeded its deadline.
    #[error("worker for {spec} timed out after {elapsed_s}s")]
    WorkerTimeout { spec: String, elapsed_s: u64 },

    /// Exit 3: the daemon and client disagree on wire format.
    #[error("protocol error: {0}")]
    ProtocolError(String),
}

/// The process exit code a CLI entrypoint should use for a given error,
/// matching the taxonomy above: 0 success, 1 user-actionable failure,
/// 2 invalid input, 3 internal/infrastructure failure.
pub fn exit_code(err: &BubbleError) -> i32 {
    match err {
        BubbleError::SpecInvalid(_) => 2,
        BubbleError::NotInstalled { .. }
        | BubbleError::BuildFailed { .. }
        | BubbleError::ActivationFailed { .. } => 1,
        BubbleError::CacheBackendError(_)
        | BubbleError::ActivationCorrupt(_)
        | BubbleError::WorkerLaunchFailed { .. }
        | BubbleError::WorkerDied { .. }
        | BubbleError::WorkerTimeout { .. }
        | BubbleError::ProtocolError(_) => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spec_invalid_is_exit_two() {
        assert_eq!(exit_code(&BubbleError::SpecInvalid("bad".into())), 2);
    }

    #[test]
    fn not_installed_is_exit_one() {
        let err = BubbleError::NotInstalled { spec: "rich==13.5.3".into() };
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn worker_died_is_exit_three() {
        let err = BubbleError::WorkerDied { spec: "numpy==1.26.4".into(), reason: "sigsegv".into() };
        assert_eq!(exit_code(&err), 3);
    }

    #[test]
    fn display_includes_spec_and_reason() {
        let err = BubbleError::BuildFailed { spec: "pandas==2.0.3".into(), reason: "wheel missing".into() };
        assert_eq!(err.to_string(), "build failed for pandas==2.0.3: wheel missing");
    }
}
