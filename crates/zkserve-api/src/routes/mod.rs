//! Route modules for the zkserve API surface.

pub mod credits;
pub mod models;
pub mod proofs;
