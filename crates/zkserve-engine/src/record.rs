//! # Proof Record
//!
//! The document the engine emits from proof generation, persisted verbatim
//! as the request's proof artifact, and the smaller client-facing summary
//! projected from it.

use serde::{Deserialize, Serialize};

/// Human-readable public inputs attached to a proof record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrettyPublicInputs {
    /// Raw public outputs, one vector per output tensor.
    pub outputs: Vec<Vec<String>>,
    /// Outputs rescaled back to the model's numeric domain.
    pub rescaled_outputs: Vec<Vec<String>>,
}

/// The full proof document emitted by the engine.
///
/// Unknown fields are preserved through `extra`, so whatever else the
/// engine writes survives a round-trip through this service untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProofRecord {
    /// Human-readable projections of the public instance.
    pub pretty_public_inputs: PrettyPublicInputs,
    /// Hex-encoded proof bytes.
    pub hex_proof: String,
    /// Engine fields this service does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProofRecord {
    /// Project the client-facing summary: first raw output, first rescaled
    /// output, and the hex proof.
    ///
    /// Returns `None` when the record carries no outputs — a malformed
    /// record the caller reports as an engine failure rather than serving
    /// empty fields.
    pub fn summary(&self) -> Option<ProofSummary> {
        let output_hex = self.pretty_public_inputs.outputs.first()?.first()?.clone();
        let output = self
            .pretty_public_inputs
            .rescaled_outputs
            .first()?
            .first()?
            .clone();
        if self.hex_proof.is_empty() {
            return None;
        }
        Some(ProofSummary {
            output_hex,
            output,
            proof_hex: self.hex_proof.clone(),
        })
    }
}

/// Client-facing proof result returned by the prove endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofSummary {
    /// First raw public output.
    pub output_hex: String,
    /// First rescaled public output.
    pub output: String,
    /// Hex-encoded proof.
    pub proof_hex: String,
}
