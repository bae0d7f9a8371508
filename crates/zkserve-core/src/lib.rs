#![deny(missing_docs)]

//! # zkserve-core — Foundational Types for zkserve
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies — only `serde`, `serde_json`,
//! `thiserror`, and `uuid` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** Every identifier is a
//!    distinct type validated at construction. You cannot pass a [`UserId`]
//!    where a [`ModelId`] is expected, and a [`ModelId`] that would escape
//!    its storage namespace is unrepresentable.
//!
//! 2. **One [`ArtifactKind`] enum.** Every per-model artifact and its
//!    on-disk filename is defined exactly once. No independent path-building
//!    logic that can diverge between pipeline stages.
//!
//! 3. **Structured errors with `thiserror`.** No `Box<dyn Error>`, no
//!    `.unwrap()` outside tests.

pub mod artifact;
pub mod error;
pub mod identity;

pub use artifact::{ArtifactKind, RequestArtifactKind};
pub use error::{StorageError, ValidationError};
pub use identity::{ModelId, RequestId, UserId};
