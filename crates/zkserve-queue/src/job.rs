//! # Job Types
//!
//! The transient unit of work submitted to the orchestrator. Jobs are not
//! persisted beyond completion; their effects live in the artifact store
//! and the credit ledger.

use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use zkserve_core::{ModelId, RequestId, UserId};
use zkserve_engine::ProofSummary;
use zkserve_pipeline::PipelineError;
use zkserve_tensor::InputTensor;

/// What a job does. One variant per pipeline operation the API submits.
#[derive(Debug)]
pub enum JobKind {
    /// Register a model from an uploaded blob.
    Register {
        /// The uploaded model bytes.
        blob: Vec<u8>,
    },
    /// Compile the model's circuit.
    Compile,
    /// Run cryptographic setup and emit the verifier.
    Setup,
    /// Generate the witness for a recorded input.
    GenWitness {
        /// The request uuid whose input to witness.
        request: RequestId,
    },
    /// Generate a proof, debiting the user's credit account.
    Prove {
        /// The paying user.
        user: UserId,
        /// The witnessed request uuid.
        request: RequestId,
    },
    /// Verify a generated proof on chain.
    Verify {
        /// The proved request uuid.
        request: RequestId,
        /// Deployed verifier contract address.
        contract_address: String,
        /// RPC endpoint to verify against.
        rpc_url: String,
    },
    /// Prepare a voice judging input tensor from raw audio.
    PrepareVoiceInput {
        /// Raw audio clip bytes.
        audio: Vec<u8>,
        /// The submitter's account address.
        address: String,
    },
}

impl JobKind {
    /// Short operation name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "register",
            Self::Compile => "compile",
            Self::Setup => "setup",
            Self::GenWitness { .. } => "gen_witness",
            Self::Prove { .. } => "prove",
            Self::Verify { .. } => "verify",
            Self::PrepareVoiceInput { .. } => "prepare_voice_input",
        }
    }
}

/// A unit of work addressed to one model.
#[derive(Debug)]
pub struct Job {
    /// The model all of this job's state belongs to.
    pub model: ModelId,
    /// The operation to perform.
    pub kind: JobKind,
}

impl Job {
    /// Construct a job.
    pub fn new(model: ModelId, kind: JobKind) -> Self {
        Self { model, kind }
    }
}

/// Successful job result.
#[derive(Debug)]
pub enum JobOutput {
    /// The model was registered.
    Registered,
    /// The circuit was compiled and the SRS fetched.
    Compiled,
    /// Keys were generated and the verifier emitted.
    KeysReady,
    /// The witness was generated.
    WitnessReady,
    /// A proof was generated.
    Proved(ProofSummary),
    /// On-chain verification completed with this outcome.
    Verified(bool),
    /// A voice judging input was prepared.
    VoiceInput(InputTensor),
}

/// Failure reported through a job handle.
#[derive(Error, Debug)]
pub enum JobError {
    /// The wait timed out. The job keeps running in the background; its
    /// eventual result is discarded and logged, never retried.
    #[error("job {job_id} still running after {waited:?}; result will be discarded")]
    TimedOut {
        /// The abandoned job.
        job_id: Uuid,
        /// How long the caller waited.
        waited: Duration,
    },

    /// The orchestrator is shutting down and no longer accepts jobs.
    #[error("job queue is closed")]
    QueueClosed,

    /// The worker disappeared (panicked) before reporting a result.
    #[error("worker lost before reporting a result")]
    WorkerLost,

    /// The pipeline stage itself failed.
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl JobError {
    /// Whether this failure is quota exhaustion.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::Pipeline(e) if e.is_quota_exceeded())
    }
}
