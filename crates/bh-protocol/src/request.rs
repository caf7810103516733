// SPDX-License-Identifier: MIT

use bh_core::Spec;
use serde::{Deserialize, Serialize};

/// Sent from the client (or the daemon, to a worker) over the data channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Version/handshake ping, answered by `Response::Ready`.
    Hello,

    /// Run `code` inside the interpreter activated for `spec`.
    Execute {
        spec: Spec,
        code: String,
        /// Positional args forwarded to the callable the code defines, if
        /// any; empty for bare statement execution.
        #[serde(default)]
        args: Vec<serde_json::Value>,
    },

    /// Report the interpreter's resolved package version for `spec`.
    GetVersion { spec: Spec },

    /// Ask a worker (or the daemon, for all workers) to exit cleanly.
    Shutdown {
        #[serde(default)]
        force: bool,
    },

    /// Daemon health/status query from the CLI.
    Status,
}

#[cfg(test)]
mod tests {
    use semver::Version;

    use super::*;

    #[test]
    fn execute_roundtrips_with_tag() {
        let req = Request::Execute {
            spec: Spec::new("rich", Version::new(13, 5, 3)),
            code: "print(1)".into(),
            args: vec![],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"type\":\"Execute\""));
        let back: Request = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }

    #[test]
    fn shutdown_force_defaults_false() {
        let req: Request = serde_json::from_str(r#"{"type":"Shutdown"}"#).unwrap();
        assert_eq!(req, Request::Shutdown { force: false });
    }
}
