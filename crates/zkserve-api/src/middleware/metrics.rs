//! # Request Metrics
//!
//! Lightweight request/error counters using atomics, injected through
//! request extensions and incremented by middleware.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    /// Total requests observed.
    pub request_count: Arc<AtomicU64>,
    /// Responses with status >= 400.
    pub error_count: Arc<AtomicU64>,
}

impl ApiMetrics {
    /// Create a new metrics instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current request count.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Current error count.
    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }
}

/// Middleware incrementing the request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(metrics) = metrics {
        metrics.request_count.fetch_add(1, Ordering::Relaxed);
        if response.status().is_client_error() || response.status().is_server_error() {
            metrics.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let metrics = ApiMetrics::new();
        assert_eq!(metrics.requests(), 0);
        assert_eq!(metrics.errors(), 0);
    }
}
