//! # Model Stage & Manifest
//!
//! The persisted per-model lifecycle state. Stages only move forward, one
//! step at a time; the manifest is the single source of truth the pipeline
//! consults before every stage operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zkserve_core::ModelId;

/// The lifecycle stage of a registered model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelStage {
    /// Model blob uploaded; nothing compiled yet.
    Registered,
    /// Circuit compiled, settings written, SRS fetched.
    CircuitCompiled,
    /// Proving/verification keys generated and verifier emitted. Terminal.
    KeysReady,
}

impl ModelStage {
    /// Return the canonical stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "REGISTERED",
            Self::CircuitCompiled => "CIRCUIT_COMPILED",
            Self::KeysReady => "KEYS_READY",
        }
    }

    /// The stage that follows this one, if any.
    pub fn next(&self) -> Option<ModelStage> {
        match self {
            Self::Registered => Some(Self::CircuitCompiled),
            Self::CircuitCompiled => Some(Self::KeysReady),
            Self::KeysReady => None,
        }
    }

    /// Whether advancing from `self` to `to` is a legal transition.
    /// Only single forward steps are legal; stages never move backwards.
    pub fn can_advance_to(&self, to: ModelStage) -> bool {
        self.next() == Some(to)
    }
}

impl std::fmt::Display for ModelStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted model manifest (`model.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// The model this manifest describes.
    pub model_id: ModelId,
    /// Current pipeline stage.
    pub stage: ModelStage,
    /// When the model was registered.
    pub created_at: DateTime<Utc>,
    /// When the stage last advanced.
    pub updated_at: DateTime<Utc>,
}

impl ModelManifest {
    /// A fresh manifest at the `Registered` stage.
    pub fn new(model_id: ModelId) -> Self {
        let now = Utc::now();
        Self {
            model_id,
            stage: ModelStage::Registered,
            created_at: now,
            updated_at: now,
        }
    }
}
