// SPDX-License-Identifier: MIT

//! Runtime configuration, threaded explicitly through every crate at
//! construction. There is no global config singleton.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which cache backend a `Config` selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// A rusqlite-backed file under `<base>/cache.db`, no network required.
    Embedded,
    /// A redis endpoint shared across hosts.
    Networked,
}

/// How `bh-store` lays out the activation target: a single shared site vs.
/// one bubble per version with no "main" install.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStrategy {
    /// One version lives uncloaked at `main_site_dir`; all others are
    /// bubbles activated on demand.
    StableMain,
    /// Every version, including the first installed, lives in a bubble.
    Multiversion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory for bubbles, the build lock, and the daemon socket.
    pub base: PathBuf,
    /// The interpreter's unmanaged site-packages directory that the
    /// activation loader cloaks into and out of.
    pub main_site_dir: PathBuf,
    pub cache_backend: CacheBackendKind,
    /// `redis://host:port` when `cache_backend` is `Networked`; ignored
    /// otherwise.
    pub cache_endpoint: Option<String>,
    pub install_strategy: InstallStrategy,
    #[serde(with = "duration_secs")]
    pub worker_idle_timeout: Duration,
}

impl Config {
    pub fn bubbles_dir(&self) -> PathBuf {
        self.base.join("bubbles")
    }

    pub fn build_lock_path(&self) -> PathBuf {
        self.base.join(".build.lock")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.base.join("bubblehost.sock")
    }

    pub fn pid_path(&self) -> PathBuf {
        self.base.join("bubblehost.pid")
    }

    pub fn cache_db_path(&self) -> PathBuf {
        self.base.join("cache.db")
    }

    /// Loads a config from a JSON file, falling back to built-in defaults
    /// rooted at `base` when `path` does not exist.
    pub fn load(path: &Path, base: PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::defaults(base));
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&raw)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn defaults(base: PathBuf) -> Self {
        let main_site_dir = base.join("main");
        Self {
            main_site_dir,
            base,
            cache_backend: CacheBackendKind::Embedded,
            cache_endpoint: None,
            install_strategy: InstallStrategy::StableMain,
            worker_idle_timeout: Duration::from_secs(900),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config at {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_derive_paths_from_base() {
        let cfg = Config::defaults(PathBuf::from("/var/lib/bubblehost"));
        assert_eq!(cfg.bubbles_dir(), PathBuf::from("/var/lib/bubblehost/bubbles"));
        assert_eq!(cfg.socket_path(), PathBuf::from("/var/lib/bubblehost/bubblehost.sock"));
        assert_eq!(cfg.cache_backend, CacheBackendKind::Embedded);
        assert_eq!(cfg.install_strategy, InstallStrategy::StableMain);
    }

    #[test]
    fn load_falls_back_to_defaults_when_missing() {
        let base = PathBuf::from("/tmp/bubblehost-test-missing");
        let cfg = Config::load(Path::new("/tmp/bubblehost-test-missing/does-not-exist.json"), base.clone())
            .unwrap();
        assert_eq!(cfg.base, base);
    }

    #[test]
    fn load_parses_json_override() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{
                "base": "/srv/bh",
                "main_site_dir": "/srv/bh/main",
                "cache_backend": "networked",
                "cache_endpoint": "redis://localhost:6379",
                "install_strategy": "multiversion",
                "worker_idle_timeout": 60
            }"#,
        )
        .unwrap();
        let cfg = Config::load(&config_path, PathBuf::from("/srv/bh")).unwrap();
        assert_eq!(cfg.cache_backend, CacheBackendKind::Networked);
        assert_eq!(cfg.cache_endpoint.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(cfg.install_strategy, InstallStrategy::Multiversion);
        assert_eq!(cfg.worker_idle_timeout, Duration::from_secs(60));
    }
}
