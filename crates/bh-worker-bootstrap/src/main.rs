// SPDX-License-Identifier: MIT

//! The worker child process: activates one bubble, sends the ready
//! handshake, then answers `Execute`/`GetVersion`/`Shutdown` requests on
//! stdin until told to stop or the pipe closes. stdout is the protocol's
//! data channel; all logging goes to stderr, which the supervisor forwards
//! line by line.

mod executor;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use bh_core::Spec;
use bh_loader::{ImportResolver, NativeResolver, Scope};
use bh_protocol::{Request, Response};
use executor::{CodeExecutor, SubprocessExecutor};
use tokio::io::{stdin, stdout, BufReader};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (spec, bubble_root, main_site_dir) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(reason) => {
            eprintln!("FATAL: {reason}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run(spec, bubble_root, main_site_dir).await {
        error!(error = %e, "worker exiting on error");
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<(Spec, PathBuf, PathBuf), String> {
    let [_, spec, bubble_root, main_site_dir] = args else {
        return Err(format!("usage: bh-worker-bootstrap <spec> <bubble_root> <main_site_dir>, got {args:?}"));
    };
    let spec = Spec::from_str(spec).map_err(|e| e.to_string())?;
    Ok((spec, PathBuf::from(bubble_root), PathBuf::from(main_site_dir)))
}

/// Lists the top-level package directories a bubble provides, the way the
/// activation loader needs to know what to cloak at the main site: anything
/// that isn't packaging metadata (`*.dist-info`, `*.egg-info`) or a leading
/// dot-directory counts as an importable top-level package.
fn provided_package_names(bubble_root: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(bubble_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name.ends_with(".dist-info") || name.ends_with(".egg-info") {
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

/// The interpreter binary `SubprocessExecutor` shells out to for
/// `Request::Execute`; overridable so tests and non-default installs don't
/// need a `python3` on `PATH`.
fn interpreter_path() -> PathBuf {
    std::env::var_os("BH_PYTHON_INTERPRETER").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("python3"))
}

async fn run(spec: Spec, bubble_root: PathBuf, main_site_dir: PathBuf) -> Result<(), std::io::Error> {
    let mut out = stdout();

    let resolver: Arc<dyn ImportResolver> = Arc::new(NativeResolver::new(Vec::new()));
    let package_names = provided_package_names(&bubble_root).unwrap_or_else(|e| {
        warn!(error = %e, "could not list bubble contents, activating with no cloak targets");
        vec![spec.name.to_string()]
    });

    let scope = match Scope::activate(resolver.clone(), &main_site_dir, &bubble_root, &package_names) {
        Ok(scope) => scope,
        Err(e) => {
            let response = Response::Error { message: e.to_string(), traceback: None };
            bh_protocol::write_message(&mut out, &response).await.ok();
            return Err(std::io::Error::other(e.to_string()));
        }
    };

    let executor: Arc<dyn CodeExecutor> = Arc::new(SubprocessExecutor::new(interpreter_path(), resolver.search_path()));

    bh_protocol::write_message(&mut out, &Response::Ready).await?;
    info!(worker = %spec, "worker ready");

    let mut input = BufReader::new(stdin());
    loop {
        let request: Request = match bh_protocol::read_request(&mut input).await {
            Ok(request) => request,
            Err(bh_protocol::ProtocolError::Closed) => break,
            Err(e) => {
                warn!(error = %e, "malformed request, ignoring");
                continue;
            }
        };

        let shutting_down = matches!(request, Request::Shutdown { .. });
        let response = handle(&request, executor.as_ref(), &bubble_root).await;
        bh_protocol::write_message(&mut out, &response).await?;
        if shutting_down {
            break;
        }
    }

    drop(scope);
    info!(worker = %spec, "worker exiting cleanly");
    Ok(())
}

async fn handle(request: &Request, executor: &dyn CodeExecutor, bubble_root: &Path) -> Response {
    match request {
        Request::Hello => Response::Ready,

        Request::Execute { spec, code, args } => {
            info!(worker = %spec, bytes = code.len(), "executing code in activated bubble");
            let outcome = executor.execute(code, args).await;
            match outcome.error {
                Some(message) => Response::Error { message, traceback: None },
                None => Response::Success { value: outcome.value, stdout: outcome.stdout },
            }
        }

        Request::GetVersion { spec } => {
            Response::Version { version: spec.version.to_string(), path: bubble_root.join(spec.name.as_str()).display().to_string() }
        }

        Request::Shutdown { .. } => Response::ShuttingDown,

        Request::Status => Response::Error {
            message: "status is a daemon-level request, not a worker one".to_string(),
            traceback: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use bh_core::PackageName;

    use super::*;

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_args_accepts_spec_bubble_root_and_main_site() {
        let args = strings(&["bh-worker-bootstrap", "pandas==2.1.0", "/bubbles/pandas-2.1.0", "/site"]);
        let (spec, bubble_root, main_site_dir) = parse_args(&args).unwrap();
        assert_eq!(spec.name, PackageName::new("pandas"));
        assert_eq!(bubble_root, PathBuf::from("/bubbles/pandas-2.1.0"));
        assert_eq!(main_site_dir, PathBuf::from("/site"));
    }

    #[test]
    fn parse_args_rejects_wrong_argument_count() {
        let args = strings(&["bh-worker-bootstrap", "pandas==2.1.0"]);
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn parse_args_rejects_an_unparsable_spec() {
        let args = strings(&["bh-worker-bootstrap", "not-a-spec", "/bubbles/x", "/site"]);
        assert!(parse_args(&args).is_err());
    }

    #[test]
    fn provided_package_names_skips_metadata_and_dotfiles() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("pandas")).unwrap();
        std::fs::create_dir(dir.path().join("pandas-2.1.0.dist-info")).unwrap();
        std::fs::create_dir(dir.path().join(".bh-marker")).unwrap();
        std::fs::write(dir.path().join("top_level.txt"), "pandas\n").unwrap();

        let mut names = provided_package_names(dir.path()).unwrap();
        names.sort();
        assert_eq!(names, vec!["pandas".to_string()]);
    }

    struct FakeExecutor {
        outcome: fn() -> executor::ExecutionOutcome,
    }

    #[async_trait::async_trait]
    impl CodeExecutor for FakeExecutor {
        async fn execute(&self, _code: &str, _args: &[serde_json::Value]) -> executor::ExecutionOutcome {
            (self.outcome)()
        }
    }

    #[tokio::test]
    async fn execute_request_reports_the_executors_stdout_and_value() {
        let executor = FakeExecutor {
            outcome: || executor::ExecutionOutcome { value: serde_json::json!(2), stdout: "hi\n".to_string(), error: None },
        };
        let spec = Spec::new("rich", semver::Version::new(13, 5, 3));
        let request = Request::Execute { spec, code: "1 + 1".to_string(), args: vec![] };

        let response = handle(&request, &executor, Path::new("/bubbles/rich-13.5.3")).await;
        match response {
            Response::Success { value, stdout } => {
                assert_eq!(value, serde_json::json!(2));
                assert_eq!(stdout, "hi\n");
            }
            other => panic!("expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn execute_request_surfaces_the_executors_error() {
        let executor = FakeExecutor {
            outcome: || executor::ExecutionOutcome {
                value: serde_json::Value::Null,
                stdout: String::new(),
                error: Some("boom".to_string()),
            },
        };
        let spec = Spec::new("rich", semver::Version::new(13, 5, 3));
        let request = Request::Execute { spec, code: "raise ValueError()".to_string(), args: vec![] };

        let response = handle(&request, &executor, Path::new("/bubbles/rich-13.5.3")).await;
        assert!(matches!(response, Response::Error { message, .. } if message == "boom"));
    }

    #[tokio::test]
    async fn get_version_reports_the_bubble_local_module_path() {
        let executor = FakeExecutor {
            outcome: || executor::ExecutionOutcome { value: serde_json::Value::Null, stdout: String::new(), error: None },
        };
        let spec = Spec::new("rich", semver::Version::new(13, 5, 3));
        let request = Request::GetVersion { spec };

        let response = handle(&request, &executor, Path::new("/bubbles/rich-13.5.3")).await;
        assert_eq!(
            response,
            Response::Version { version: "13.5.3".to_string(), path: "/bubbles/rich-13.5.3/rich".to_string() }
        );
    }
}
