//! # zkserve-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the zkserve proving service.
//! Configuration comes from the environment:
//!
//! - `PORT` — listen port (default 8000)
//! - `AUTH_TOKEN` — static bearer token; unset disables auth
//! - `ARTIFACTS_DIR` — artifact store root (default `Artifacts`)
//! - `WORKER_COUNT` — orchestrator workers (default 4)
//! - `JOB_TIMEOUT_SECS` — per-request job wait bound (default 600)

use std::time::Duration;

use zkserve_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Build configuration from environment.
    let defaults = AppConfig::default();
    let port: u16 = env_parsed("PORT").unwrap_or(defaults.port);
    let auth_token = std::env::var("AUTH_TOKEN")
        .ok()
        .map(zkserve_api::auth::SecretToken::new);
    let artifacts_dir = std::env::var("ARTIFACTS_DIR")
        .map(Into::into)
        .unwrap_or(defaults.artifacts_dir);
    let workers: usize = env_parsed("WORKER_COUNT").unwrap_or(defaults.workers);
    let job_timeout = env_parsed("JOB_TIMEOUT_SECS")
        .map(Duration::from_secs)
        .unwrap_or(defaults.job_timeout);

    let config = AppConfig {
        port,
        auth_token,
        artifacts_dir,
        workers,
        job_timeout,
    };
    tracing::info!(?config, "starting zkserve");

    let state = AppState::new(config)?;
    let app = zkserve_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("zkserve API listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Parse an environment variable, ignoring unset or malformed values.
fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
