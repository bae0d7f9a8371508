//! # Per-Request Proof Routes
//!
//! The input → witness → proof → verification sub-pipeline, plus voice
//! input preparation. Stage work goes through the orchestrator with the
//! handler blocking on the result; only the input upload itself is a
//! direct (quick) pipeline call.
//!
//! ## Endpoints
//!
//! - `POST /uploadinput` — record an input, get `latest_uuid`
//! - `POST /genwitness` — generate the witness for a uuid
//! - `POST /prove` — generate a proof (debits credits)
//! - `POST /verifyproof` — verify a proof on chain
//! - `POST /voicejudge` — prepare a voice judging input tensor

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkserve_core::{ModelId, RequestId, UserId};
use zkserve_queue::{Job, JobKind, JobOutput};
use zkserve_tensor::InputTensor;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::models::unexpected_output;
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Request to record an input for later witnessing.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UploadInputRequest {
    /// The model this input targets.
    pub model_name: String,
    /// The nested input rows.
    #[schema(value_type = Vec<Vec<f64>>)]
    pub input_data: Vec<Vec<serde_json::Number>>,
}

impl Validate for UploadInputRequest {
    fn validate(&self) -> Result<(), String> {
        if self.input_data.is_empty() {
            return Err("input_data must not be empty".to_string());
        }
        Ok(())
    }
}

/// Response carrying the request uuid for follow-up calls.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadInputResponse {
    /// Token identifying this submission in later requests.
    pub latest_uuid: String,
}

/// Request to generate the witness for a recorded input.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GenWitnessRequest {
    /// The model the input belongs to.
    pub model_name: String,
    /// The uuid returned by the input upload.
    pub latest_uuid: String,
}

/// Witness generation completion.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct GenWitnessResponse {
    /// The witnessed request uuid.
    pub latest_uuid: String,
    /// Completion message.
    pub message: String,
}

/// Request to generate a proof.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ProveRequest {
    /// The model to prove against.
    pub model_name: String,
    /// The paying user's account address.
    pub address: String,
    /// The witnessed request uuid.
    pub latest_uuid: String,
}

/// The client-facing proof result.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProveResponse {
    /// First raw public output.
    pub output_hex: String,
    /// First rescaled public output.
    pub output: String,
    /// Hex-encoded proof.
    pub proof_hex: String,
}

/// Request to verify a proof against a deployed contract.
#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyProofRequest {
    /// The model the proof belongs to.
    pub model_name: String,
    /// The proved request uuid.
    pub latest_uuid: String,
    /// Deployed verifier contract address.
    pub address: String,
    /// RPC endpoint to verify against.
    pub rpc_url: String,
}

impl Validate for VerifyProofRequest {
    fn validate(&self) -> Result<(), String> {
        if self.address.trim().is_empty() {
            return Err("address must not be empty".to_string());
        }
        if self.rpc_url.trim().is_empty() {
            return Err("rpc_url must not be empty".to_string());
        }
        Ok(())
    }
}

/// On-chain verification outcome.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyProofResponse {
    /// Whether the contract accepted the proof.
    pub verified: bool,
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the proof sub-pipeline router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploadinput", post(upload_input))
        .route("/genwitness", post(gen_witness))
        .route("/prove", post(prove))
        .route("/verifyproof", post(verify_proof))
        .route("/voicejudge", post(voice_judge))
}

// ── Handlers ────────────────────────────────────────────────────────

/// POST /uploadinput — Record an input payload under a fresh uuid.
#[utoipa::path(
    post,
    path = "/uploadinput",
    request_body = UploadInputRequest,
    responses(
        (status = 200, description = "Input recorded", body = UploadInputResponse),
        (status = 404, description = "Model not found", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
pub(crate) async fn upload_input(
    State(state): State<AppState>,
    body: Result<Json<UploadInputRequest>, JsonRejection>,
) -> Result<Json<UploadInputResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let model = ModelId::new(&req.model_name)?;
    let tensor = InputTensor {
        input_data: req.input_data,
    };

    let pipeline = state.pipeline.clone();
    let request = tokio::task::spawn_blocking(move || pipeline.upload_input(&model, &tensor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(Json(UploadInputResponse {
        latest_uuid: request.to_string(),
    }))
}

/// POST /genwitness — Generate the witness for a recorded input.
#[utoipa::path(
    post,
    path = "/genwitness",
    request_body = GenWitnessRequest,
    responses(
        (status = 200, description = "Witness generated", body = GenWitnessResponse),
        (status = 404, description = "Model or input not found", body = crate::error::ErrorBody),
        (status = 409, description = "Circuit not compiled yet", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
pub(crate) async fn gen_witness(
    State(state): State<AppState>,
    body: Result<Json<GenWitnessRequest>, JsonRejection>,
) -> Result<Json<GenWitnessResponse>, AppError> {
    let req = extract_json_plain(body)?;
    let model = ModelId::new(&req.model_name)?;
    let request = RequestId::parse(&req.latest_uuid)?;

    let output = state
        .orchestrator
        .run(
            Job::new(model, JobKind::GenWitness { request }),
            state.config.job_timeout,
        )
        .await?;
    match output {
        JobOutput::WitnessReady => Ok(Json(GenWitnessResponse {
            latest_uuid: req.latest_uuid,
            message: "witness generated successfully".to_string(),
        })),
        other => Err(unexpected_output(&other)),
    }
}

/// POST /prove — Generate a proof, debiting the caller's credit account.
///
/// Quota exhaustion returns 429 `QUOTA_EXCEEDED` and applies no debit.
#[utoipa::path(
    post,
    path = "/prove",
    request_body = ProveRequest,
    responses(
        (status = 200, description = "Proof generated", body = ProveResponse),
        (status = 404, description = "Model or witness not found", body = crate::error::ErrorBody),
        (status = 429, description = "No remaining credits", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
pub(crate) async fn prove(
    State(state): State<AppState>,
    body: Result<Json<ProveRequest>, JsonRejection>,
) -> Result<Json<ProveResponse>, AppError> {
    let req = extract_json_plain(body)?;
    let model = ModelId::new(&req.model_name)?;
    let user = UserId::new(&req.address)?;
    let request = RequestId::parse(&req.latest_uuid)?;

    let output = state
        .orchestrator
        .run(
            Job::new(model, JobKind::Prove { user, request }),
            state.config.job_timeout,
        )
        .await?;
    match output {
        JobOutput::Proved(summary) => Ok(Json(ProveResponse {
            output_hex: summary.output_hex,
            output: summary.output,
            proof_hex: summary.proof_hex,
        })),
        other => Err(unexpected_output(&other)),
    }
}

/// POST /verifyproof — Verify a generated proof on chain.
#[utoipa::path(
    post,
    path = "/verifyproof",
    request_body = VerifyProofRequest,
    responses(
        (status = 200, description = "Verification outcome", body = VerifyProofResponse),
        (status = 404, description = "Model or proof not found", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
pub(crate) async fn verify_proof(
    State(state): State<AppState>,
    body: Result<Json<VerifyProofRequest>, JsonRejection>,
) -> Result<Json<VerifyProofResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let model = ModelId::new(&req.model_name)?;
    let request = RequestId::parse(&req.latest_uuid)?;

    let output = state
        .orchestrator
        .run(
            Job::new(
                model,
                JobKind::Verify {
                    request,
                    contract_address: req.address,
                    rpc_url: req.rpc_url,
                },
            ),
            state.config.job_timeout,
        )
        .await?;
    match output {
        JobOutput::Verified(verified) => Ok(Json(VerifyProofResponse { verified })),
        other => Err(unexpected_output(&other)),
    }
}

/// POST /voicejudge — Prepare a voice judging input tensor.
///
/// Multipart form: `file` (audio clip), `address`, `model_name`. Returns
/// the prepared `{"input_data": …}` document, ready for `/uploadinput`.
#[utoipa::path(
    post,
    path = "/voicejudge",
    request_body(content_type = "multipart/form-data", description = "Fields: `file`, `address`, `model_name`"),
    responses(
        (status = 200, description = "Prepared input tensor"),
        (status = 422, description = "Invalid address or empty audio", body = crate::error::ErrorBody),
    ),
    tag = "proofs"
)]
pub(crate) async fn voice_judge(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<InputTensor>, AppError> {
    let upload = read_voice_upload(multipart).await?;
    let model = ModelId::new(&upload.model_name)?;

    let output = state
        .orchestrator
        .run(
            Job::new(
                model,
                JobKind::PrepareVoiceInput {
                    audio: upload.audio,
                    address: upload.address,
                },
            ),
            state.config.job_timeout,
        )
        .await?;
    match output {
        JobOutput::VoiceInput(tensor) => Ok(Json(tensor)),
        other => Err(unexpected_output(&other)),
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Extract a JSON body without a `Validate` impl.
fn extract_json_plain<T>(result: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    crate::extractors::extract_json(result)
}

struct VoiceUpload {
    model_name: String,
    address: String,
    audio: Vec<u8>,
}

/// Pull `model_name`, `address`, and `file` out of a voice judging upload.
async fn read_voice_upload(mut multipart: Multipart) -> Result<VoiceUpload, AppError> {
    let mut model_name: Option<String> = None;
    let mut address: Option<String> = None;
    let mut audio: Option<Vec<u8>> = None;

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
            Some("address") => {
                address = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.body_text()))?,
                );
            }
            Some("file") => {
                audio = Some(
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

    Ok(VoiceUpload {
        model_name: model_name
            .ok_or_else(|| AppError::BadRequest("missing field: model_name".into()))?,
        address: address.ok_or_else(|| AppError::BadRequest("missing field: address".into()))?,
        audio: audio.ok_or_else(|| AppError::BadRequest("missing field: file".into()))?,
    })
}
