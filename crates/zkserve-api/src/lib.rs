#![deny(missing_docs)]

//! # zkserve-api — Axum REST Surface
//!
//! The HTTP layer over the job orchestrator. Every stage mutation flows
//! through submit-then-await on the orchestrator; handlers are synchronous
//! request/response from the client's point of view.
//!
//! ## API Surface
//!
//! | Method | Path              | Module              | Purpose                      |
//! |--------|-------------------|---------------------|------------------------------|
//! | GET    | `/checkmodelname` | [`routes::models`]  | name availability            |
//! | POST   | `/setup`          | [`routes::models`]  | register + compile + setup   |
//! | GET    | `/getverifyer`    | [`routes::models`]  | compiled verifier download   |
//! | GET    | `/userbalance`    | [`routes::credits`] | credit counters              |
//! | POST   | `/addusercredit`  | [`routes::credits`] | raise quota                  |
//! | POST   | `/uploadinput`    | [`routes::proofs`]  | record input, get uuid       |
//! | POST   | `/genwitness`     | [`routes::proofs`]  | witness generation           |
//! | POST   | `/prove`          | [`routes::proofs`]  | proof generation (debits)    |
//! | POST   | `/verifyproof`    | [`routes::proofs`]  | on-chain verification        |
//! | POST   | `/voicejudge`     | [`routes::proofs`]  | voice input preparation      |
//!
//! Health probes (`/health/*`) and the service index are mounted outside
//! the auth middleware so they remain accessible without credentials.
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CorsLayer → TraceLayer → MetricsMiddleware → AuthMiddleware → Handler
//! ```

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

pub use error::AppError;

/// Maximum accepted request body. Model uploads are the big ones.
const MAX_BODY_BYTES: usize = 64 * 1024 * 1024;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::models::router())
        .merge(routes::credits::router())
        .merge(routes::proofs::router())
        .merge(openapi::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .with_state(state);

    // Unauthenticated index and health probes.
    let open = Router::new()
        .route("/", get(index))
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));

    Router::new().merge(open).merge(api)
}

/// GET / — service banner.
async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "zkserve",
        "message": "welcome to the zkserve proving service",
    }))
}

/// Liveness probe — 200 whenever the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — 200 once the application can serve requests.
async fn readiness() -> &'static str {
    "ready"
}
