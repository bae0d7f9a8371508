#![deny(missing_docs)]

//! # zkserve-engine — Prover Capability Adapter
//!
//! Defines the typed interface the pipeline uses to drive the external
//! proving engine, and a deterministic mock implementation for development
//! and tests.
//!
//! ## Contract
//!
//! Every operation is blocking from the adapter's perspective and fails
//! loudly: any non-success from the underlying engine surfaces as
//! [`EngineError`], never as a silently ignored status. The orchestrator
//! runs these calls on blocking worker threads.
//!
//! The trait bounds require `Send + Sync` so one engine instance can be
//! shared across the worker pool.

mod mock;
mod record;
mod traits;

pub use mock::{MockContractCompiler, MockEngine};
pub use record::{PrettyPublicInputs, ProofRecord, ProofSummary};
pub use traits::{
    CompiledCircuitBundle, CompiledContract, ContractCompiler, EngineError, KeyPair,
    ProvingEngine, VerifierContract, Visibility, VisibilityConfig,
};
