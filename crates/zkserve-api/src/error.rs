//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from the pipeline, ledger, and orchestrator to HTTP
//! status codes with JSON error bodies. Quota exhaustion has its own code
//! so clients can distinguish it from generic failure, and internal error
//! details are never exposed in responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use zkserve_core::ValidationError;
use zkserve_pipeline::PipelineError;
use zkserve_queue::JobError;

/// Structured JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// The error payload.
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "QUOTA_EXCEEDED", "NOT_FOUND").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorBody {
    /// Build a body from a code and message.
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.to_string(),
                message: message.into(),
            },
        }
    }
}

/// Application-level error type that implements [`IntoResponse`].
#[derive(Error, Debug)]
pub enum AppError {
    /// Referenced model, witness, or proof does not exist (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Operation conflicts with the model's current stage (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The user has no remaining proof credits (429).
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The job is still running after the configured wait (504).
    #[error("job timeout: {0}")]
    JobTimeout(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code and machine-readable code for this error.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::QuotaExceeded(_) => (StatusCode::TOO_MANY_REQUESTS, "QUOTA_EXCEEDED"),
            Self::JobTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "JOB_TIMEOUT"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        (status, Json(ErrorBody::new(code, message))).into_response()
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match &err {
            PipelineError::ModelNotFound(_)
            | PipelineError::MissingInput { .. }
            | PipelineError::MissingWitness { .. }
            | PipelineError::MissingProof { .. } => Self::NotFound(err.to_string()),

            PipelineError::ModelExists(_)
            | PipelineError::WrongStage { .. }
            | PipelineError::InvalidTransition { .. } => Self::Conflict(err.to_string()),

            PipelineError::Input(_) => Self::Validation(err.to_string()),

            _ if err.is_quota_exceeded() => {
                Self::QuotaExceeded("you don't have enough credits".to_string())
            }

            // Engine, storage, and non-quota ledger failures stay opaque.
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<JobError> for AppError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::TimedOut { .. } => Self::JobTimeout(err.to_string()),
            JobError::QueueClosed | JobError::WorkerLost => Self::Internal(err.to_string()),
            JobError::Pipeline(inner) => inner.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkserve_core::{ModelId, RequestId, UserId};
    use zkserve_ledger::LedgerError;

    #[test]
    fn quota_exceeded_maps_to_429_with_distinct_code() {
        let err = AppError::from(PipelineError::Ledger(LedgerError::QuotaExceeded {
            user: UserId::new("0xA").unwrap(),
            model: ModelId::new("m1").unwrap(),
            used: 10,
            total: 10,
        }));
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(code, "QUOTA_EXCEEDED");
    }

    #[test]
    fn missing_witness_maps_to_404() {
        let err = AppError::from(PipelineError::MissingWitness {
            model: ModelId::new("m1").unwrap(),
            request: RequestId::generate(),
        });
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "NOT_FOUND");
    }

    #[test]
    fn duplicate_model_maps_to_409() {
        let err = AppError::from(PipelineError::ModelExists(ModelId::new("m1").unwrap()));
        let (status, _) = err.status_and_code();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn engine_failure_maps_to_opaque_500() {
        let err = AppError::from(PipelineError::Engine {
            stage: "prove",
            source: zkserve_engine::EngineError::Prove("prover crashed at /secret/path".into()),
        });
        let (status, _) = err.status_and_code();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn job_timeout_maps_to_504() {
        let err = AppError::from(JobError::TimedOut {
            job_id: uuid_for_test(),
            waited: std::time::Duration::from_secs(1),
        });
        let (status, code) = err.status_and_code();
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(code, "JOB_TIMEOUT");
    }

    fn uuid_for_test() -> uuid::Uuid {
        uuid::Uuid::new_v4()
    }

    // ── into_response tests ──────────────────────────────────────

    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
        (status, body)
    }

    #[tokio::test]
    async fn internal_response_hides_details() {
        let (status, body) = response_parts(AppError::Internal("engine died at /var/x".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.message, "An internal error occurred");
        assert!(!body.error.message.contains("/var/x"));
    }

    #[tokio::test]
    async fn quota_response_carries_explicit_message() {
        let (status, body) =
            response_parts(AppError::QuotaExceeded("you don't have enough credits".into())).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error.code, "QUOTA_EXCEEDED");
        assert!(body.error.message.contains("credits"));
    }
}
