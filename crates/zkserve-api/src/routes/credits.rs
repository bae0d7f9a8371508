//! # Credit Ledger Routes
//!
//! Balance queries and quota top-ups. All mutations go through the
//! ledger's atomic operations; these handlers only translate identifiers
//! and map errors.
//!
//! ## Endpoints
//!
//! - `GET /userbalance` — account counters, zero-defaults for unknown users
//! - `POST /addusercredit` — raise a user's quota ceiling

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use zkserve_core::{ModelId, UserId};
use zkserve_ledger::CreditAccount;

use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

// ── Request/Response DTOs ───────────────────────────────────────────

/// Query string for a balance lookup.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// The user's account address.
    pub address: String,
    /// The model the credits apply to.
    pub model_name: String,
}

/// Credit account counters, in the ledger document's field names.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BalanceResponse {
    /// Proof verifications performed on chain.
    #[serde(rename = "onChainReq")]
    pub on_chain_requests: u64,
    /// Off-chain proof generations debited so far.
    #[serde(rename = "offChainReq")]
    pub off_chain_requests: u64,
    /// Quota ceiling for off-chain proof generations.
    #[serde(rename = "totalReq")]
    pub total_requests: u64,
}

impl From<CreditAccount> for BalanceResponse {
    fn from(account: CreditAccount) -> Self {
        Self {
            on_chain_requests: account.on_chain_requests,
            off_chain_requests: account.off_chain_requests,
            total_requests: account.total_requests,
        }
    }
}

/// Request to raise a user's quota.
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCreditRequest {
    /// The model the credits apply to.
    pub model_name: String,
    /// The user's account address.
    pub address: String,
    /// Credits to add. Must be non-negative.
    pub new_credit: i64,
}

impl Validate for AddCreditRequest {
    fn validate(&self) -> Result<(), String> {
        if self.new_credit < 0 {
            return Err("new_credit must be non-negative".to_string());
        }
        Ok(())
    }
}

// ── Router ──────────────────────────────────────────────────────────

/// Build the credit ledger router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/userbalance", get(user_balance))
        .route("/addusercredit", post(add_user_credit))
}

// ── Handlers ────────────────────────────────────────────────────────

/// GET /userbalance — A user's credit counters for one model.
///
/// Users the ledger has never seen report all-zero counters rather than an
/// error; an unknown model is a 404.
#[utoipa::path(
    get,
    path = "/userbalance",
    params(
        ("address" = String, Query, description = "User account address"),
        ("model_name" = String, Query, description = "Model name"),
    ),
    responses(
        (status = 200, description = "Account counters", body = BalanceResponse),
        (status = 404, description = "Model not found", body = crate::error::ErrorBody),
    ),
    tag = "credits"
)]
pub(crate) async fn user_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> Result<Json<BalanceResponse>, AppError> {
    let model = ModelId::new(&query.model_name)?;
    let user = UserId::new(&query.address)?;

    let pipeline = state.pipeline.clone();
    let account = tokio::task::spawn_blocking(move || {
        // Manifest lookup doubles as the 404 check for unknown models.
        pipeline.manifest(&model)?;
        pipeline.ledger().balance(&user, &model).map_err(Into::into)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(|e: zkserve_pipeline::PipelineError| AppError::from(e))?;

    Ok(Json(account.into()))
}

/// POST /addusercredit — Raise a user's quota ceiling.
#[utoipa::path(
    post,
    path = "/addusercredit",
    request_body = AddCreditRequest,
    responses(
        (status = 200, description = "Updated account", body = BalanceResponse),
        (status = 404, description = "Model not found", body = crate::error::ErrorBody),
        (status = 422, description = "Negative credit amount", body = crate::error::ErrorBody),
    ),
    tag = "credits"
)]
pub(crate) async fn add_user_credit(
    State(state): State<AppState>,
    body: Result<Json<AddCreditRequest>, JsonRejection>,
) -> Result<Json<BalanceResponse>, AppError> {
    let req = extract_validated_json(body)?;
    let model = ModelId::new(&req.model_name)?;
    let user = UserId::new(&req.address)?;
    let amount = req.new_credit as u64;

    let pipeline = state.pipeline.clone();
    let account = tokio::task::spawn_blocking(move || {
        pipeline.manifest(&model)?;
        pipeline.ledger().credit(&user, &model, amount).map_err(Into::into)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
    .map_err(|e: zkserve_pipeline::PipelineError| AppError::from(e))?;

    Ok(Json(account.into()))
}
