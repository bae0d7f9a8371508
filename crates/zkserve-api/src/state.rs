//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor.
//!
//! ## Architecture
//!
//! AppState holds the orchestrator (the only path for pipeline stage
//! mutations), the pipeline itself (for quick synchronous reads and the
//! input-upload write), and the configuration. Handlers never touch the
//! artifact store or the ledger except through these two.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use zkserve_engine::{ContractCompiler, MockContractCompiler, MockEngine, ProvingEngine};
use zkserve_ledger::CreditLedger;
use zkserve_pipeline::ProofPipeline;
use zkserve_queue::{Orchestrator, OrchestratorConfig};
use zkserve_store::ArtifactStore;
use zkserve_tensor::{FeatureExtractor, WindowedEnergy};

use crate::auth::SecretToken;

/// Application configuration, assembled from the environment in `main`.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer token. `None` disables authentication.
    pub auth_token: Option<SecretToken>,
    /// Root directory of the artifact store.
    pub artifacts_dir: PathBuf,
    /// Orchestrator worker count.
    pub workers: usize,
    /// How long a request handler waits for its job before reporting a
    /// timeout. The job itself keeps running.
    pub job_timeout: Duration,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("artifacts_dir", &self.artifacts_dir)
            .field("workers", &self.workers)
            .field("job_timeout", &self.job_timeout)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            auth_token: None,
            artifacts_dir: PathBuf::from("Artifacts"),
            workers: 4,
            job_timeout: Duration::from_secs(600),
        }
    }
}

/// Shared application state accessible to all route handlers.
/// Clone-friendly via `Arc` internals.
#[derive(Clone)]
pub struct AppState {
    /// The job orchestrator — the only path for stage mutations.
    pub orchestrator: Orchestrator,
    /// The pipeline, for synchronous reads and input recording.
    pub pipeline: Arc<ProofPipeline>,
    /// Application configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Build state over the filesystem store with the built-in mock engine.
    ///
    /// Production deployments swap the engine via [`AppState::with_engine`];
    /// everything else stays identical.
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        Self::with_engine(
            config,
            Arc::new(MockEngine),
            Arc::new(MockContractCompiler),
            Arc::new(WindowedEnergy::default()),
        )
    }

    /// Build state with explicit engine, contract compiler, and feature
    /// extractor implementations.
    pub fn with_engine(
        config: AppConfig,
        engine: Arc<dyn ProvingEngine>,
        contracts: Arc<dyn ContractCompiler>,
        features: Arc<dyn FeatureExtractor>,
    ) -> anyhow::Result<Self> {
        let store = ArtifactStore::new(&config.artifacts_dir)?;
        let ledger = CreditLedger::new(store.clone());
        let pipeline = Arc::new(ProofPipeline::new(store, ledger, engine, contracts, features));
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Build state over an existing pipeline. Used by tests to control the
    /// store location, engine, and quota directly.
    pub fn with_pipeline(config: AppConfig, pipeline: Arc<ProofPipeline>) -> Self {
        let orchestrator = Orchestrator::new(
            Arc::clone(&pipeline),
            OrchestratorConfig {
                workers: config.workers,
                ..OrchestratorConfig::default()
            },
        );
        Self {
            orchestrator,
            pipeline,
            config,
        }
    }
}
