//! # Authentication Middleware
//!
//! Optional static bearer token authentication. When no token is
//! configured, every request passes (development mode); when one is set,
//! requests must carry `Authorization: Bearer {token}` and the comparison
//! is constant-time.

use axum::extract::Request;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::error::ErrorBody;

use std::sync::Arc;

/// A bearer token secret. Zeroed on drop; never printed.
#[derive(Clone)]
pub struct SecretToken(Arc<SecretInner>);

struct SecretInner(String);

impl Drop for SecretInner {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl SecretToken {
    /// Wrap a token value.
    pub fn new(value: String) -> Self {
        Self(Arc::new(SecretInner(value)))
    }

    /// Constant-time comparison against a provided token.
    ///
    /// When lengths differ, a dummy comparison keeps timing independent of
    /// where the mismatch occurs.
    pub fn matches(&self, provided: &str) -> bool {
        let expected = self.0 .0.as_bytes();
        let provided = provided.as_bytes();
        if provided.len() != expected.len() {
            let _ = expected.ct_eq(expected);
            return false;
        }
        provided.ct_eq(expected).into()
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

/// Auth configuration injected into request extensions.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The expected token; `None` disables authentication.
    pub token: Option<SecretToken>,
}

/// Validate the `Authorization: Bearer` header when a token is configured.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = request.extensions().get::<AuthConfig>().cloned();

    let Some(AuthConfig { token: Some(expected) }) = config else {
        // Auth disabled.
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match provided {
        Some(token) if expected.matches(token) => next.run(request).await,
        Some(_) => unauthorized("invalid bearer token"),
        None => unauthorized("missing bearer token"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("UNAUTHORIZED", message)),
    )
        .into_response()
}
