//! # Identifier Newtypes
//!
//! Validated domain identifiers. Each identifier is a distinct type so
//! signatures document which namespace a value belongs to, and invalid
//! values are rejected at the boundary instead of deep inside a pipeline
//! stage.
//!
//! [`ModelId`] and [`UserId`] are used as filesystem path components, so
//! their validation exists to make path traversal unrepresentable — every
//! accepted value is a single, safe path segment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// ModelId
// ---------------------------------------------------------------------------

/// Caller-assigned identifier of a registered model.
///
/// Doubles as the model's storage namespace (directory name), so the
/// accepted alphabet is restricted to `[A-Za-z0-9._-]`, 1-64 characters,
/// with no leading dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    /// Maximum accepted length, in bytes.
    pub const MAX_LEN: usize = 64;

    /// Create a model id from a string, validating directory-safety.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidModelId`] if the value is empty,
    /// too long, starts with a dot, or contains characters outside
    /// `[A-Za-z0-9._-]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if Self::is_valid(&s) {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidModelId(s))
        }
    }

    /// Validate without constructing. Used by `/checkmodelname`.
    pub fn is_valid(s: &str) -> bool {
        !s.is_empty()
            && s.len() <= Self::MAX_LEN
            && !s.starts_with('.')
            && s.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    }

    /// Access the model id string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// Per-input-submission token (`latest_uuid` at the API boundary).
///
/// Generated server-side on input upload; later requests echo it back and
/// it is parsed, not trusted, on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh random request id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a request id from its string form.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidRequestId`] if the string is not a
    /// valid UUID.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(value)
            .map(Self)
            .map_err(|_| ValidationError::InvalidRequestId(value.to_string()))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// The caller's account address, used as the credit-ledger key.
///
/// Typically a 0x-prefixed chain address, but any single-segment value is
/// accepted: non-empty, at most 128 bytes, no separators, no NUL, no
/// leading dot. The ledger stores it verbatim as a JSON object key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Maximum accepted length, in bytes.
    pub const MAX_LEN: usize = 128;

    /// Create a user id from a string.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidUserId`] for empty, oversized, or
    /// separator-containing values.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let ok = !s.is_empty()
            && s.len() <= Self::MAX_LEN
            && !s.starts_with('.')
            && !s.chars().any(|c| matches!(c, '/' | '\\' | '\0'));
        if ok {
            Ok(Self(s))
        } else {
            Err(ValidationError::InvalidUserId(s))
        }
    }

    /// Access the user id string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
