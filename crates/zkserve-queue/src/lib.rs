#![deny(missing_docs)]

//! # zkserve-queue — Job Orchestrator
//!
//! A worker pool consuming a shared job queue. The client-facing contract
//! is synchronous-looking — submit, then block on the result with a bounded
//! timeout — while execution is asynchronous underneath.
//!
//! ## Ordering guarantee
//!
//! Jobs addressing the **same model** execute with mutual exclusion: a
//! worker acquires the model's lock before running any stage logic, so
//! stage transitions per model are totally ordered. Jobs for distinct
//! models run concurrently across the pool.
//!
//! ## Timeout semantics
//!
//! A caller abandoning its wait abandons only the wait: the job runs to
//! completion or failure in the background, its result is discarded and
//! logged, and nothing is retried automatically. Shared state is never
//! left half-applied by a timeout.

mod job;
mod orchestrator;

pub use job::{Job, JobError, JobKind, JobOutput};
pub use orchestrator::{JobHandle, Orchestrator, OrchestratorConfig};
