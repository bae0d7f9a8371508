//! # Artifact Taxonomy
//!
//! Every artifact the pipeline produces, together with its on-disk name,
//! defined in one place. Pipeline stages and the API layer address artifacts
//! through these enums only; nothing else in the workspace builds artifact
//! filenames.
//!
//! The filenames match the layout the service has always used on disk
//! (`network.onnx`, `privateKey.pk`, `kzg.srs`, …), so an existing artifact
//! tree remains readable after upgrades.

use serde::{Deserialize, Serialize};

use crate::identity::RequestId;

/// A per-model artifact stored directly in the model's namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The uploaded model, as received (`network.onnx`).
    ModelBlob,
    /// The circuit produced by the engine's compile step (`network.compiled`).
    CompiledCircuit,
    /// The engine settings document emitted alongside compilation
    /// (`settings.json`).
    Settings,
    /// The proving key from cryptographic setup (`privateKey.pk`).
    ProvingKey,
    /// The verification key from cryptographic setup (`verification.vk`).
    VerificationKey,
    /// The structured reference string, fetched at most once per model
    /// (`kzg.srs`).
    Srs,
    /// The emitted Solidity verifier source (`verifier.sol`).
    VerifierContract,
    /// The verifier contract ABI document (`ABI.json`).
    VerifierAbi,
    /// The model manifest carrying the persisted pipeline stage
    /// (`model.json`).
    Manifest,
}

impl ArtifactKind {
    /// The artifact's filename inside the model namespace.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ModelBlob => "network.onnx",
            Self::CompiledCircuit => "network.compiled",
            Self::Settings => "settings.json",
            Self::ProvingKey => "privateKey.pk",
            Self::VerificationKey => "verification.vk",
            Self::Srs => "kzg.srs",
            Self::VerifierContract => "verifier.sol",
            Self::VerifierAbi => "ABI.json",
            Self::Manifest => "model.json",
        }
    }

    /// All artifact kinds, in pipeline production order.
    pub fn all() -> [ArtifactKind; 9] {
        [
            Self::ModelBlob,
            Self::Settings,
            Self::CompiledCircuit,
            Self::Srs,
            Self::ProvingKey,
            Self::VerificationKey,
            Self::VerifierContract,
            Self::VerifierAbi,
            Self::Manifest,
        ]
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A per-request artifact, keyed by `(model, request uuid)`.
///
/// Stored under the model namespace in a subdirectory per kind:
/// `input/input_{uuid}.json`, `witness/witness_{uuid}.json`,
/// `proof/proof_{uuid}.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestArtifactKind {
    /// The input tensor recorded at submission time.
    Input,
    /// The witness generated from the input and compiled circuit.
    Witness,
    /// The proof record generated from the witness.
    Proof,
}

impl RequestArtifactKind {
    /// Subdirectory holding artifacts of this kind.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Witness => "witness",
            Self::Proof => "proof",
        }
    }

    /// Filename for a specific request's artifact of this kind.
    pub fn file_name(&self, request: &RequestId) -> String {
        format!("{}_{}.json", self.dir_name(), request)
    }

    /// All request artifact kinds, in sub-pipeline order.
    pub fn all() -> [RequestArtifactKind; 3] {
        [Self::Input, Self::Witness, Self::Proof]
    }
}
