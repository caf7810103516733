// SPDX-License-Identifier: MIT

//! Centralized environment variable access for the daemon binary.

use std::path::PathBuf;

use crate::error::DaemonError;

/// `BH_BASE_DIR` > `XDG_STATE_HOME/bubblehost` > `~/.local/state/bubblehost`.
pub fn base_dir() -> Result<PathBuf, DaemonError> {
    if let Ok(dir) = std::env::var("BH_BASE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("bubblehost"));
    }
    let home = std::env::var("HOME").map_err(|_| DaemonError::NoBaseDir)?;
    Ok(PathBuf::from(home).join(".local/state/bubblehost"))
}

/// Path to the optional JSON config file overriding `Config::defaults()`.
pub fn config_path(base: &std::path::Path) -> PathBuf {
    std::env::var("BH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| base.join("config.json"))
}

/// Locates the `bh-worker-bootstrap` binary: an explicit override, then a
/// sibling of this process's own executable, then a bare `PATH` lookup.
pub fn bootstrap_exe() -> PathBuf {
    if let Ok(path) = std::env::var("BH_WORKER_BOOTSTRAP") {
        return PathBuf::from(path);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("bh-worker-bootstrap");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("bh-worker-bootstrap")
}
