#![deny(missing_docs)]

//! # zkserve-pipeline — Pipeline State Machine
//!
//! Enforces the ordered stages a model passes through and the per-request
//! sub-pipeline that turns submitted inputs into witnesses and proofs.
//!
//! ## Model lifecycle
//!
//! ```text
//! REGISTERED ─compile()──▶ CIRCUIT_COMPILED ─setup()──▶ KEYS_READY
//! ```
//!
//! The stage is a first-class persisted field of the model manifest
//! (`model.json`), never inferred from which artifact files happen to
//! exist. Transitions are forward-only and advance only after every
//! artifact of the stage has been durably written; a failed stage leaves
//! the manifest exactly where it was.
//!
//! ## Per-request sub-pipeline
//!
//! `upload_input → generate_witness → prove → verify`, each step requiring
//! the previous step's artifact. `prove` additionally debits the credit
//! ledger before the engine is invoked, and never invokes it past quota.
//!
//! ## Concurrency
//!
//! Methods here are synchronous and assume the caller (the orchestrator)
//! holds the model's job lock. The store and ledger still provide their own
//! atomicity, so a misbehaving caller can corrupt ordering but not
//! individual documents.

mod error;
mod pipeline;
mod stage;

pub use error::PipelineError;
pub use pipeline::ProofPipeline;
pub use stage::{ModelManifest, ModelStage};
