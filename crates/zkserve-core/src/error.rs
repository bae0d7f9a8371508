//! # Error Types — Shared Error Hierarchy
//!
//! Defines the error types used across the zkserve workspace. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Validation errors carry the offending value so callers can report it.
//! - Storage errors distinguish "the artifact does not exist" from transport
//!   level I/O failures; only the former maps to a 404 at the API boundary.

use std::path::PathBuf;

use thiserror::Error;

/// Request-level validation failure. Reported to the caller; no side effects.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The model identifier is not directory-safe.
    #[error("invalid model id {0:?}: must be 1-64 chars of [A-Za-z0-9._-] with no leading dot")]
    InvalidModelId(String),

    /// The request uuid could not be parsed.
    #[error("invalid request uuid: {0:?}")]
    InvalidRequestId(String),

    /// The user address is empty or contains path separators.
    #[error("invalid user id {0:?}")]
    InvalidUserId(String),

    /// A request field is missing or malformed.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// The boundary field name as it appears in the JSON document.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Failure in the durable artifact layer. Fatal for the current job.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The referenced artifact does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// Path that was probed.
        path: PathBuf,
    },

    /// Underlying filesystem operation failed.
    #[error("storage i/o at {path}: {source}")]
    Io {
        /// Path involved in the failed operation.
        path: PathBuf,
        /// The propagated I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A stored document exists but could not be decoded.
    #[error("corrupt document at {path}: {reason}")]
    Corrupt {
        /// Path of the unreadable document.
        path: PathBuf,
        /// Decoding failure description.
        reason: String,
    },
}

impl StorageError {
    /// Attach path context to a raw I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the artifact simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
