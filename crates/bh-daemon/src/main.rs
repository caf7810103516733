// SPDX-License-Identifier: MIT

//! `bhd`: the bubblehost daemon. Owns the metadata cache, the bubble store,
//! and the worker supervisor behind a single Unix socket.

mod env;
mod error;
mod lifecycle;
mod listener;

use std::sync::Arc;

use bh_core::Config;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "daemon exiting on startup failure");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), error::DaemonError> {
    let base = env::base_dir()?;
    let config = Config::load(&env::config_path(&base), base)?;

    let daemon = Arc::new(lifecycle::startup(config)?);
    listener::run(daemon.clone()).await;
    daemon.shutdown().await;
    Ok(())
}
