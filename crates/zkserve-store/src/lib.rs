#![deny(missing_docs)]

//! # zkserve-store — Durable Artifact Storage
//!
//! Filesystem-backed keyed storage of pipeline artifacts. One directory per
//! model, addressed exclusively through [`zkserve_core::ArtifactKind`] and
//! [`zkserve_core::RequestArtifactKind`] — no other crate builds artifact
//! paths.
//!
//! ## Layout
//!
//! ```text
//! {root}/{model_id}/network.onnx            uploaded model
//! {root}/{model_id}/settings.json           engine settings
//! {root}/{model_id}/network.compiled        compiled circuit
//! {root}/{model_id}/kzg.srs                 structured reference string
//! {root}/{model_id}/privateKey.pk           proving key
//! {root}/{model_id}/verification.vk         verification key
//! {root}/{model_id}/verifier.sol            emitted verifier source
//! {root}/{model_id}/ABI.json                verifier ABI
//! {root}/{model_id}/model.json              pipeline manifest
//! {root}/{model_id}/users.json              credit ledger document
//! {root}/{model_id}/input/input_{uuid}.json
//! {root}/{model_id}/witness/witness_{uuid}.json
//! {root}/{model_id}/proof/proof_{uuid}.json
//! ```
//!
//! ## Write Discipline
//!
//! Writes for a given key only ever originate from one pipeline stage, so
//! last-writer-wins per key is sufficient. Each write goes through a
//! temporary file in the same directory followed by a rename, so a crash
//! mid-write never leaves a torn artifact behind.

mod store;

pub use store::ArtifactStore;
