//! # Model Lifecycle Routes
//!
//! Model name availability, the setup pipeline (register → compile →
//! setup, blocking until keys are ready), and verifier contract download.
//!
//! ## Endpoints
//!
//! - `GET /checkmodelname` — name availability
//! - `POST /setup` — multipart model upload, runs compile + setup
//! - `GET /getverifyer` — compiled verifier `{abi, bin}`

use axum::extract::{Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkserve_core::ModelId;
use zkserve_queue::{Job, JobKind, JobOutput};

use crate::error::AppError;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Query string carrying a model name.
#[derive(Debug, Deserialize)]
pub struct ModelNameQuery {
    /// The model name to act on.
    pub model_name: String,
}

/// Response for model name availability.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckModelNameResponse {
    /// Whether the name is well-formed and not yet taken.
    pub is_valid: bool,
}

/// Response for a completed setup pipeline.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetupResponse {
    /// The registered model name.
    pub model_name: String,
    /// The stage the model finished at.
    pub stage: String,
}

/// Compiled verifier contract for deployment.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifierResponse {
    /// Contract ABI document.
    #[schema(value_type = Object)]
    pub abi: serde_json::Value,
    /// Hex-encoded deployment bytecode.
    pub bin: String,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the model lifecycle router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkmodelname", get(check_model_name))
        .route("/setup", post(setup))
        .route("/getverifyer", get(get_verifier))
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /checkmodelname — Is this model name available?
///
/// A name is valid when it is directory-safe and no model of that name
/// exists yet. Malformed names report `is_valid: false` rather than an
/// error, matching the frontend's usage as a live availability check.
#[utoipa::path(
    get,
    path = "/checkmodelname",
    params(("model_name" = String, Query, description = "Model name to check")),
    responses((status = 200, description = "Availability result", body = CheckModelNameResponse)),
    tag = "models"
)]
pub(crate) async fn check_model_name(
    State(state): State<AppState>,
    Query(query): Query<ModelNameQuery>,
) -> Result<Json<CheckModelNameResponse>, AppError> {
    let is_valid = match ModelId::new(&query.model_name) {
        Ok(model) => {
            let store = state.pipeline.store().clone();
            !tokio::task::spawn_blocking(move || store.model_exists(&model))
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?
        }
        Err(_) => false,
    };
    Ok(Json(CheckModelNameResponse { is_valid }))
}

/// POST /setup — Upload a model and run the full setup pipeline.
///
/// Registers the model, then blocks on the compile and setup jobs in
/// order. Returns once keys are ready and the verifier is emitted.
#[utoipa::path(
    post,
    path = "/setup",
    request_body(content_type = "multipart/form-data", description = "Fields: `model_name`, `file`"),
    responses(
        (status = 200, description = "Setup completed", body = SetupResponse),
        (status = 409, description = "Model already exists", body = crate::error::ErrorBody),
        (status = 422, description = "Invalid model name", body = crate::error::ErrorBody),
        (status = 504, description = "Job still running", body = crate::error::ErrorBody),
    ),
    tag = "models"
)]
pub(crate) async fn setup(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<SetupResponse>, AppError> {
    let (model_name, blob) = read_model_upload(multipart).await?;
    let model = ModelId::new(&model_name)?;
    let timeout = state.config.job_timeout;

    state
        .orchestrator
        .run(Job::new(model.clone(), JobKind::Register { blob }), timeout)
        .await?;
    state
        .orchestrator
        .run(Job::new(model.clone(), JobKind::Compile), timeout)
        .await?;
    state
        .orchestrator
        .run(Job::new(model.clone(), JobKind::Setup), timeout)
        .await?;

    Ok(Json(SetupResponse {
        model_name,
        stage: "KEYS_READY".to_string(),
    }))
}

/// GET /getverifyer — Download the compiled verifier contract.
#[utoipa::path(
    get,
    path = "/getverifyer",
    params(("model_name" = String, Query, description = "Model whose verifier to compile")),
    responses(
        (status = 200, description = "Compiled verifier", body = VerifierResponse),
        (status = 404, description = "Model not found", body = crate::error::ErrorBody),
        (status = 409, description = "Model not set up yet", body = crate::error::ErrorBody),
    ),
    tag = "models"
)]
pub(crate) async fn get_verifier(
    State(state): State<AppState>,
    Query(query): Query<ModelNameQuery>,
) -> Result<Json<VerifierResponse>, AppError> {
    let model = ModelId::new(&query.model_name)?;
    let pipeline = state.pipeline.clone();
    let bundle = tokio::task::spawn_blocking(move || pipeline.verifier_bundle(&model))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;
    Ok(Json(VerifierResponse {
        abi: bundle.abi,
        bin: bundle.bin,
    }))
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Pull `model_name` and `file` out of a setup upload.
async fn read_model_upload(mut multipart: Multipart) -> Result<(String, Vec<u8>), AppError> {
    let mut model_name: Option<String> = None;
    let mut blob: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("model_name") => {
                model_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?,
                );
            }
            Some("file") => {
                blob = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let model_name =
        model_name.ok_or_else(|| AppError::BadRequest("missing field: model_name".into()))?;
    let blob = blob.ok_or_else(|| AppError::BadRequest("missing field: file".into()))?;
    if blob.is_empty() {
        return Err(AppError::Validation("uploaded model file is empty".into()));
    }
    Ok((model_name, blob))
}

/// Unexpected job output for the requested kind — a bug, not a user error.
pub(crate) fn unexpected_output(output: &JobOutput) -> AppError {
    AppError::Internal(format!("unexpected job output: {output:?}"))
}
