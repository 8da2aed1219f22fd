//! Gateway error taxonomy and client-facing error bodies.
//!
//! # Design Decisions
//! - Every routing/availability/breaker/proxy failure is caught at the
//!   handler boundary and becomes a structured JSON body with a stable
//!   machine-readable code and a timestamp; nothing escapes unhandled
//! - Configuration errors are not represented here: they are fatal at
//!   startup (see `config::loader`)
//! - Health-probe failures never reach this layer

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::health::state::now_ms;

/// Failures the proxy call itself can produce, after retries are exhausted.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("upstream request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("upstream connection failed: {0}")]
    Connection(String),

    #[error("failed to read request body: {0}")]
    BodyRead(String),

    #[error("failed to build upstream request: {0}")]
    BadRequest(String),
}

/// Request-boundary errors, each with a stable client-facing code.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no route matches {path}")]
    RouteNotFound { path: String },

    #[error("service {service} has no healthy instance")]
    ServiceUnavailable { service: String },

    #[error("circuit breaker open for service {service}")]
    CircuitOpen { service: String },

    #[error("proxy to {service} failed: {source}")]
    Proxy {
        service: String,
        #[source]
        source: ProxyError,
    },
}

impl GatewayError {
    /// Machine-readable error code, stable across releases.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RouteNotFound { .. } => "SERVICE_NOT_FOUND",
            Self::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            Self::CircuitOpen { .. } => "CIRCUIT_BREAKER_OPEN",
            Self::Proxy { .. } => "PROXY_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ServiceUnavailable { .. } | Self::CircuitOpen { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Proxy { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "code": self.code(),
            "timestamp": now_ms(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_and_statuses_are_stable() {
        let cases = [
            (
                GatewayError::RouteNotFound { path: "/x".into() },
                "SERVICE_NOT_FOUND",
                StatusCode::NOT_FOUND,
            ),
            (
                GatewayError::ServiceUnavailable { service: "booking".into() },
                "SERVICE_UNAVAILABLE",
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GatewayError::CircuitOpen { service: "booking".into() },
                "CIRCUIT_BREAKER_OPEN",
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GatewayError::Proxy {
                    service: "booking".into(),
                    source: ProxyError::Timeout { timeout_ms: 30_000 },
                },
                "PROXY_ERROR",
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (error, code, status) in cases {
            assert_eq!(error.code(), code);
            assert_eq!(error.status(), status);
        }
    }
}
