//! # Pipeline Errors
//!
//! Every way a stage operation can fail, with enough structure for the API
//! layer to pick the right status code without string matching.

use thiserror::Error;

use zkserve_core::{ModelId, RequestId, StorageError};
use zkserve_engine::EngineError;
use zkserve_ledger::LedgerError;
use zkserve_tensor::TensorError;

use crate::stage::ModelStage;

/// Failure of a pipeline stage operation. A failed stage aborts only the
/// current job and never advances the model's recorded stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The referenced model has never been registered.
    #[error("model {0} not found")]
    ModelNotFound(ModelId),

    /// Registration was attempted for a name already in use.
    #[error("model {0} already exists")]
    ModelExists(ModelId),

    /// The operation requires a different pipeline stage.
    #[error("model {model} is at stage {actual}, but {operation} requires {required}")]
    WrongStage {
        /// The addressed model.
        model: ModelId,
        /// The operation that was attempted.
        operation: &'static str,
        /// The stage the operation requires.
        required: ModelStage,
        /// The stage the model is actually at.
        actual: ModelStage,
    },

    /// A stage tried to move the manifest along an illegal edge.
    #[error("invalid stage transition for model {model}: {from} -> {to}")]
    InvalidTransition {
        /// The addressed model.
        model: ModelId,
        /// Stage before the attempted transition.
        from: ModelStage,
        /// Attempted target stage.
        to: ModelStage,
    },

    /// No input has been uploaded for this request uuid.
    #[error("no input recorded for request {request} on model {model}")]
    MissingInput {
        /// The addressed model.
        model: ModelId,
        /// The request uuid.
        request: RequestId,
    },

    /// Proof generation was attempted before witness generation.
    #[error("no witness exists for request {request} on model {model}")]
    MissingWitness {
        /// The addressed model.
        model: ModelId,
        /// The request uuid.
        request: RequestId,
    },

    /// Verification was attempted before proof generation.
    #[error("no proof exists for request {request} on model {model}")]
    MissingProof {
        /// The addressed model.
        model: ModelId,
        /// The request uuid.
        request: RequestId,
    },

    /// The external engine signaled failure. Fatal for the current job.
    #[error("proving engine failure during {stage}: {source}")]
    Engine {
        /// Stage context for the log line.
        stage: &'static str,
        /// The engine's failure.
        #[source]
        source: EngineError,
    },

    /// Credit ledger failure, including quota exhaustion.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Input preparation failure.
    #[error(transparent)]
    Input(#[from] TensorError),

    /// Artifact storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl PipelineError {
    /// Whether this failure is quota exhaustion — the one ledger outcome
    /// with its own client-facing contract.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Ledger(LedgerError::QuotaExceeded { .. }))
    }

    /// Attach stage context to an engine failure.
    pub(crate) fn engine(stage: &'static str, source: EngineError) -> Self {
        Self::Engine { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_stage_names_operation_and_stages() {
        let err = PipelineError::WrongStage {
            model: ModelId::new("m1").unwrap(),
            operation: "setup",
            required: ModelStage::CircuitCompiled,
            actual: ModelStage::Registered,
        };
        let msg = err.to_string();
        assert!(msg.contains("setup"));
        assert!(msg.contains("CIRCUIT_COMPILED"));
        assert!(msg.contains("REGISTERED"));
    }

    #[test]
    fn quota_exhaustion_is_detectable() {
        let err = PipelineError::Ledger(LedgerError::QuotaExceeded {
            user: zkserve_core::UserId::new("0xA").unwrap(),
            model: ModelId::new("m1").unwrap(),
            used: 10,
            total: 10,
        });
        assert!(err.is_quota_exceeded());

        let other = PipelineError::ModelNotFound(ModelId::new("m1").unwrap());
        assert!(!other.is_quota_exceeded());
    }
}
