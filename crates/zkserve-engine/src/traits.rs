//! # Proving Engine Trait
//!
//! Abstract interface for the external proving system. One method per
//! pipeline stage; each maps to exactly one external call.
//!
//! ## Failure Invariant
//!
//! Implementations must return `Err` for every non-success outcome of the
//! underlying engine. The pipeline treats any error as fatal for the
//! current job and leaves the model at its last completed stage.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::ProofRecord;

/// Failure signaled by the external proving engine or contract toolchain.
/// Fatal for the current job; surfaced to the caller as an opaque failure
/// and logged with stage context.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Circuit compilation failed.
    #[error("circuit compilation failed: {0}")]
    Compile(String),
    /// Fetching the structured reference string failed.
    #[error("srs fetch failed: {0}")]
    Srs(String),
    /// Cryptographic key setup failed.
    #[error("key setup failed: {0}")]
    Setup(String),
    /// Emitting the verifier contract failed.
    #[error("verifier emission failed: {0}")]
    Verifier(String),
    /// Witness generation failed.
    #[error("witness generation failed: {0}")]
    Witness(String),
    /// Proof generation failed.
    #[error("proof generation failed: {0}")]
    Prove(String),
    /// On-chain verification could not be performed.
    #[error("on-chain verification failed: {0}")]
    Verify(String),
    /// The external contract compiler rejected the verifier source.
    #[error("contract compilation failed: {0}")]
    ContractCompile(String),
}

/// Visibility of one circuit input class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Value is part of the public instance.
    Public,
    /// Value stays private to the prover.
    Private,
    /// Value is baked into the circuit at compile time.
    Fixed,
}

/// Circuit visibility configuration passed to compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Visibility of model inputs.
    #[serde(rename = "input_visibility")]
    pub input: Visibility,
    /// Visibility of model outputs.
    #[serde(rename = "output_visibility")]
    pub output: Visibility,
    /// Visibility of model parameters.
    #[serde(rename = "param_visibility")]
    pub param: Visibility,
}

impl Default for VisibilityConfig {
    /// The production configuration: public inputs and outputs, fixed
    /// parameters.
    fn default() -> Self {
        Self {
            input: Visibility::Public,
            output: Visibility::Public,
            param: Visibility::Fixed,
        }
    }
}

/// Output of circuit compilation: the compiled circuit and the settings
/// document the engine derives for it.
#[derive(Debug, Clone)]
pub struct CompiledCircuitBundle {
    /// Compiled circuit blob, opaque to this service.
    pub circuit: Vec<u8>,
    /// Engine settings document (JSON), persisted alongside the circuit.
    pub settings: Vec<u8>,
}

/// Output of cryptographic setup.
#[derive(Debug, Clone)]
pub struct KeyPair {
    /// Proving key blob.
    pub proving_key: Vec<u8>,
    /// Verification key blob.
    pub verification_key: Vec<u8>,
}

/// The verifier contract the engine emits for on-chain verification.
#[derive(Debug, Clone)]
pub struct VerifierContract {
    /// Solidity source text.
    pub source: String,
    /// Contract ABI document.
    pub abi: serde_json::Value,
}

/// A verifier contract compiled to deployable form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledContract {
    /// Contract ABI document.
    pub abi: serde_json::Value,
    /// Hex-encoded deployment bytecode.
    pub bin: String,
}

/// Blocking capability interface over the external proving engine.
///
/// One engine instance serves every model; all per-model state lives in the
/// artifact store, never inside the engine adapter.
pub trait ProvingEngine: Send + Sync {
    /// Compile an uploaded model into a circuit and settings document.
    fn compile(
        &self,
        model: &[u8],
        visibility: &VisibilityConfig,
    ) -> Result<CompiledCircuitBundle, EngineError>;

    /// Fetch the structured reference string for the given settings.
    ///
    /// The pipeline calls this at most once per model (keyed by artifact
    /// existence); implementations need not deduplicate.
    fn fetch_srs(&self, settings: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// Run cryptographic setup, producing the proving/verification keys.
    fn setup_keys(&self, circuit: &[u8], srs: &[u8]) -> Result<KeyPair, EngineError>;

    /// Emit the on-chain verifier contract for a verification key.
    fn emit_verifier(
        &self,
        verification_key: &[u8],
        settings: &[u8],
        srs: &[u8],
    ) -> Result<VerifierContract, EngineError>;

    /// Generate a witness for one input against the compiled circuit.
    ///
    /// Must be deterministic: identical `(input, circuit)` bytes produce a
    /// byte-identical witness, which is what makes re-running the witness
    /// stage for the same request safe.
    fn generate_witness(&self, input: &[u8], circuit: &[u8]) -> Result<Vec<u8>, EngineError>;

    /// Generate a proof from a witness.
    fn generate_proof(
        &self,
        witness: &[u8],
        circuit: &[u8],
        proving_key: &[u8],
        srs: &[u8],
    ) -> Result<ProofRecord, EngineError>;

    /// Verify a proof against a deployed verifier contract over the given
    /// RPC endpoint.
    fn verify_on_chain(
        &self,
        contract_address: &str,
        proof: &ProofRecord,
        rpc_url: &str,
    ) -> Result<bool, EngineError>;
}

/// Blocking seam to the external Solidity toolchain used by the verifier
/// download endpoint.
pub trait ContractCompiler: Send + Sync {
    /// Compile verifier source to its ABI and deployment bytecode.
    fn compile_verifier(&self, source: &str) -> Result<CompiledContract, EngineError>;
}
