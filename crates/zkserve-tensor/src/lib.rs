#![deny(missing_docs)]

//! # zkserve-tensor — Input Preparation
//!
//! The boundary input document (`{"input_data": [[…], […]]}`), the
//! account-address limb encoding used to bind an input to its submitter,
//! and the feature-extraction seam behind the voice judging endpoint.
//!
//! Feature extraction itself is an external concern — a pure function from
//! raw audio bytes to a fixed-shape numeric matrix. This crate specifies
//! the [`FeatureExtractor`] trait the service needs and ships a
//! deterministic built-in implementation standing in for the external DSP
//! library, plus the pad-or-truncate framing that fixes the matrix at
//! 128 × 130 regardless of clip length.

mod address;
mod features;
mod tensor;

pub use address::{address_limbs, limbs_to_le_bytes};
pub use features::{voice_input, FeatureExtractor, FeatureMatrix, WindowedEnergy, FRAMES, MEL_BANDS};
pub use tensor::{InputTensor, TensorError};
