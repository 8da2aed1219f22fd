//! Outbound proxy call with bounded retries.
//!
//! # Responsibilities
//! - Build the whitelisted outbound header set
//! - Forward method, path/query and (for non-GET/HEAD) the buffered body
//! - Retry network failures with exponential backoff, bounded per service
//! - Translate the upstream response, preserving its status code
//!
//! # Design Decisions
//! - One invocation per client request: internal retries are invisible to
//!   the circuit breaker, which records only the net outcome
//! - Non-2xx upstream responses are responses, not failures; they are
//!   forwarded as-is and never retried
//! - Every attempt runs under the service's configured deadline; on expiry
//!   the in-flight request future is dropped, cancelling it

use std::time::Duration;

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header::HeaderName, HeaderMap, HeaderValue, Method, Request, Response};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use tokio::time;

use crate::config::ServiceConfig;
use crate::observability::metrics;
use crate::proxy::error::ProxyError;
use crate::resilience::backoff::calculate_backoff;

/// Request headers copied through to the upstream. Everything else,
/// including hop-by-hop headers, is dropped.
const FORWARDED_REQUEST_HEADERS: [&str; 6] = [
    "authorization",
    "content-type",
    "user-agent",
    "x-forwarded-for",
    "x-real-ip",
    "x-request-id",
];

/// Response headers never copied back to the client.
const HOP_BY_HOP_HEADERS: [&str; 6] = [
    "connection",
    "keep-alive",
    "transfer-encoding",
    "upgrade",
    "proxy-authenticate",
    "proxy-authorization",
];

/// Base of the retry backoff schedule: 2s, 4s, 8s, ...
const BACKOFF_BASE_MS: u64 = 1_000;
const BACKOFF_MAX_MS: u64 = 60_000;

/// Largest upstream response body the gateway will buffer.
const MAX_RESPONSE_BYTES: usize = 2 * 1024 * 1024;

/// Build the outbound header set: whitelist the inbound headers, inject the
/// gateway identity, and carry the (already synthesized) request id.
fn build_headers(inbound: &HeaderMap, request_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in FORWARDED_REQUEST_HEADERS {
        let name = HeaderName::from_static(name);
        if let Some(value) = inbound.get(&name) {
            headers.insert(name, value.clone());
        }
    }
    headers.insert("x-gateway", HeaderValue::from_static("rental-gateway"));
    if let Ok(value) = HeaderValue::from_str(request_id) {
        headers.insert("x-request-id", value);
    }
    headers
}

/// Issue the proxy call for one client request.
///
/// `body` must already be buffered (None for GET/HEAD) so every retry can
/// resend it. Only network errors and timeouts are retried; after the
/// configured retry count is exhausted the last failure propagates.
pub async fn forward(
    client: &Client<HttpConnector, Body>,
    service: &ServiceConfig,
    method: Method,
    path_and_query: &str,
    inbound_headers: &HeaderMap,
    body: Option<Bytes>,
    request_id: &str,
) -> Result<Response<Body>, ProxyError> {
    let uri = format!("{}{}", service.url.trim_end_matches('/'), path_and_query);
    let headers = build_headers(inbound_headers, request_id);
    let deadline = Duration::from_millis(service.timeout_ms);

    let mut attempt: u32 = 0;
    loop {
        let mut builder = Request::builder().method(method.clone()).uri(&uri);
        if let Some(outbound) = builder.headers_mut() {
            outbound.extend(headers.clone());
        }
        let request = builder
            .body(match &body {
                Some(bytes) => Body::from(bytes.clone()),
                None => Body::empty(),
            })
            .map_err(|e| ProxyError::BadRequest(e.to_string()))?;

        let failure = match time::timeout(deadline, client.request(request)).await {
            Ok(Ok(response)) => {
                return translate_response(response, service).await;
            }
            Ok(Err(e)) => ProxyError::Connection(e.to_string()),
            Err(_) => ProxyError::Timeout {
                timeout_ms: service.timeout_ms,
            },
        };

        if attempt >= service.retries {
            tracing::error!(
                service = %service.name,
                request_id = %request_id,
                attempts = attempt + 1,
                error = %failure,
                "Upstream call failed, retries exhausted"
            );
            return Err(failure);
        }

        attempt += 1;
        let delay = calculate_backoff(attempt, BACKOFF_BASE_MS, BACKOFF_MAX_MS);
        tracing::warn!(
            service = %service.name,
            request_id = %request_id,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %failure,
            "Upstream call failed, retrying"
        );
        metrics::record_retry(&service.name);
        time::sleep(delay).await;
    }
}

/// Rebuild the upstream response for the client: original status, copied
/// headers minus hop-by-hop, body re-emitted as JSON when it parses and as
/// raw text otherwise.
async fn translate_response(
    response: Response<hyper::body::Incoming>,
    service: &ServiceConfig,
) -> Result<Response<Body>, ProxyError> {
    let (parts, body) = response.into_parts();
    let bytes = to_bytes(Body::new(body), MAX_RESPONSE_BYTES)
        .await
        .map_err(|e| ProxyError::Connection(format!("reading upstream body: {e}")))?;

    let body = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(value) => Body::from(serde_json::to_vec(&value).unwrap_or_else(|_| bytes.to_vec())),
        Err(_) => {
            if !bytes.is_empty() {
                tracing::debug!(service = %service.name, "Upstream body is not JSON, passing through as text");
            }
            Body::from(bytes)
        }
    };

    let mut builder = Response::builder().status(parts.status);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            let lowered = name.as_str();
            if HOP_BY_HOP_HEADERS.contains(&lowered) || lowered == "content-length" {
                continue;
            }
            headers.insert(name.clone(), value.clone());
        }
    }
    builder
        .body(body)
        .map_err(|e| ProxyError::BadRequest(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelists_and_injects_headers() {
        let mut inbound = HeaderMap::new();
        inbound.insert("authorization", HeaderValue::from_static("Bearer token"));
        inbound.insert("content-type", HeaderValue::from_static("application/json"));
        inbound.insert("cookie", HeaderValue::from_static("session=secret"));
        inbound.insert("host", HeaderValue::from_static("gateway.local"));

        let headers = build_headers(&inbound, "req-123");

        assert_eq!(headers.get("authorization").unwrap(), "Bearer token");
        assert_eq!(headers.get("content-type").unwrap(), "application/json");
        assert_eq!(headers.get("x-gateway").unwrap(), "rental-gateway");
        assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
        // Non-whitelisted headers never leak upstream.
        assert!(headers.get("cookie").is_none());
        assert!(headers.get("host").is_none());
    }

    #[test]
    fn request_id_always_present_outbound() {
        let headers = build_headers(&HeaderMap::new(), "synthesized-id");
        assert_eq!(headers.get("x-request-id").unwrap(), "synthesized-id");
    }
}
