// SPDX-License-Identifier: MIT

//! The seam between the wire-protocol loop and whatever actually runs
//! `execute`'s code. `bh-worker-bootstrap` owns activation and the request
//! loop, not the interpreter — mirrors the seam
//! `bh_worker::fallback::InProcessExecutor` gives the thread-backed worker,
//! so neither path hard-codes a stub response.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;

/// The result of running one `Request::Execute`'s code.
pub struct ExecutionOutcome {
    pub value: serde_json::Value,
    pub stdout: String,
    pub error: Option<String>,
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, code: &str, args: &[serde_json::Value]) -> ExecutionOutcome;
}

/// Runs code in a real interpreter subprocess against the scope's activated
/// search path — one interpreter per worker process, matching the
/// one-bubble-per-process model the bootstrap binary already uses.
pub struct SubprocessExecutor {
    interpreter: PathBuf,
    search_path: Vec<PathBuf>,
}

impl SubprocessExecutor {
    pub fn new(interpreter: PathBuf, search_path: Vec<PathBuf>) -> Self {
        Self { interpreter, search_path }
    }
}

#[async_trait]
impl CodeExecutor for SubprocessExecutor {
    async fn execute(&self, code: &str, args: &[serde_json::Value]) -> ExecutionOutcome {
        let pythonpath = std::env::join_paths(self.search_path.iter()).unwrap_or_default();
        let args_json = serde_json::to_string(args).unwrap_or_else(|_| "[]".to_string());

        let output = Command::new(&self.interpreter)
            .arg("-c")
            .arg(code)
            .env("PYTHONPATH", pythonpath)
            .env("BH_WORKER_ARGS", args_json)
            .output()
            .await;

        match output {
            Ok(out) if out.status.success() => ExecutionOutcome {
                value: serde_json::Value::Null,
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                error: None,
            },
            Ok(out) => ExecutionOutcome {
                value: serde_json::Value::Null,
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                error: Some(String::from_utf8_lossy(&out.stderr).into_owned()),
            },
            Err(e) => ExecutionOutcome { value: serde_json::Value::Null, stdout: String::new(), error: Some(e.to_string()) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_on_a_successful_run() {
        // Stands in for the interpreter binary; the executor has no
        // python-specific wiring to test, only process plumbing.
        let executor = SubprocessExecutor::new(PathBuf::from("echo"), vec![]);
        let outcome = executor.execute("hello", &[]).await;
        assert!(outcome.error.is_none());
        assert_eq!(outcome.stdout.trim(), "-c hello");
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported_as_an_error() {
        let executor = SubprocessExecutor::new(PathBuf::from("false"), vec![]);
        let outcome = executor.execute("ignored", &[]).await;
        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn missing_interpreter_is_reported_as_an_error() {
        let executor = SubprocessExecutor::new(PathBuf::from("/no/such/interpreter"), vec![]);
        let outcome = executor.execute("ignored", &[]).await;
        assert!(outcome.error.is_some());
    }
}
