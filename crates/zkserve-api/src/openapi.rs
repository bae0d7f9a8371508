//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "zkserve API",
        version = "0.3.2",
        description = "Proof-generation-as-a-service: model setup, witness and proof generation, credit management, and on-chain verification.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        // Models
        crate::routes::models::check_model_name,
        crate::routes::models::setup,
        crate::routes::models::get_verifier,
        // Credits
        crate::routes::credits::user_balance,
        crate::routes::credits::add_user_credit,
        // Proofs
        crate::routes::proofs::upload_input,
        crate::routes::proofs::gen_witness,
        crate::routes::proofs::prove,
        crate::routes::proofs::verify_proof,
        crate::routes::proofs::voice_judge,
    ),
    components(schemas(
        crate::routes::models::CheckModelNameResponse,
        crate::routes::models::SetupResponse,
        crate::routes::models::VerifierResponse,
        crate::routes::credits::BalanceResponse,
        crate::routes::credits::AddCreditRequest,
        crate::routes::proofs::UploadInputRequest,
        crate::routes::proofs::UploadInputResponse,
        crate::routes::proofs::GenWitnessRequest,
        crate::routes::proofs::GenWitnessResponse,
        crate::routes::proofs::ProveRequest,
        crate::routes::proofs::ProveResponse,
        crate::routes::proofs::VerifyProofRequest,
        crate::routes::proofs::VerifyProofResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "models", description = "Model registration, setup, and verifier download"),
        (name = "credits", description = "Per-user proof generation quotas"),
        (name = "proofs", description = "Input upload, witness/proof generation, verification"),
    )
)]
pub struct ApiDoc;

/// Router serving the assembled spec.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — the generated spec document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
