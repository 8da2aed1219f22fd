//! HTTP server setup and the request-handling entry point.
//!
//! # Responsibilities
//! - Create the Axum router: gateway-own endpoints plus the proxy fallback
//! - Wire up middleware (tracing, timeout, request ID)
//! - Tie routing, health and circuit breaking together per request
//! - Run the probe loop alongside request handling
//!
//! # Request Handling
//! ```text
//! inbound request
//!     → gateway-own endpoint? handle locally
//!     → route table match            (miss → 404 SERVICE_NOT_FOUND)
//!     → healthy instance lookup      (none → 503 SERVICE_UNAVAILABLE)
//!     → breaker.execute(proxy call)  (open → 503 CIRCUIT_BREAKER_OPEN,
//!                                     retries exhausted → 502 PROXY_ERROR)
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::health::state::now_ms;
use crate::health::HealthMonitor;
use crate::observability::metrics;
use crate::proxy::error::GatewayError;
use crate::proxy::forwarder;
use crate::registry::ServiceRegistry;
use crate::resilience::{BreakerError, BreakerOptions, CircuitBreakerManager};
use crate::routing::RouteTable;

/// Largest client request body the gateway will buffer for forwarding.
const MAX_REQUEST_BYTES: usize = 2 * 1024 * 1024;

/// Application state injected into handlers.
///
/// Explicit owned runtime objects, shared by reference: multiple gateway
/// instances can coexist in one process (used heavily by tests).
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ServiceRegistry>,
    pub routes: Arc<RouteTable>,
    pub health: Arc<HealthMonitor>,
    pub breakers: Arc<CircuitBreakerManager>,
    pub client: Client<HttpConnector, Body>,
    pub metrics_handle: Option<PrometheusHandle>,
}

/// The gateway HTTP server.
pub struct GatewayServer {
    router: Router,
    config: GatewayConfig,
    health: Arc<HealthMonitor>,
}

impl GatewayServer {
    /// Create a new server with the given (already validated) configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let registry = Arc::new(ServiceRegistry::new(config.services.clone()));
        let routes = Arc::new(RouteTable::from_config(&config.routes));
        let health = Arc::new(HealthMonitor::new(
            registry.clone(),
            config.health_check.clone(),
        ));
        let breakers = Arc::new(CircuitBreakerManager::new());
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let metrics_handle = config
            .observability
            .metrics_enabled
            .then(metrics::recorder_handle);

        let state = AppState {
            registry,
            routes,
            health: health.clone(),
            breakers,
            client,
            metrics_handle,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            health,
        }
    }

    /// Build the Axum router. Gateway-own endpoints are registered as
    /// explicit routes and therefore bypass the proxy route table.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(root_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/services", get(services_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.listener.request_timeout_secs,
            )))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, services = self.config.services.len(), "Gateway starting");

        if self.config.health_check.enabled {
            self.health.start().await;
        }

        let health = self.health.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        health.stop().await;
        tracing::info!("Gateway stopped");
        Ok(())
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Gateway identity banner.
async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "name": "rental-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ok",
        "endpoints": ["/health", "/metrics", "/services"],
    }))
}

/// Aggregated service health and breaker status. Responds 503 when any
/// tracked service is currently down.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stats = state.health.stats();
    let status = if stats.unhealthy == 0 { "ok" } else { "degraded" };
    let code = if stats.unhealthy == 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": status,
        "timestamp": now_ms(),
        "services": stats,
        "circuit_breakers": state.breakers.all_stats(),
    });
    (code, Json(body))
}

/// Prometheus metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics_handle {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// Per-service health snapshots.
async fn services_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "services": state.health.all_health() }))
}

/// The proxy entry point for every non-gateway path.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();

    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| path.clone());

    // 1. Resolve the route.
    let Some(service_name) = state.routes.resolve(&path).map(str::to_string) else {
        tracing::warn!(request_id = %request_id, path = %path, "No route matched");
        return respond(
            GatewayError::RouteNotFound { path },
            &method,
            "none",
            &request_id,
            started,
        );
    };

    // 2. A healthy instance must exist; this check is independent of the
    //    service's breaker state.
    let Some(instance) = state.health.get_healthy_service(&service_name) else {
        return respond(
            GatewayError::ServiceUnavailable {
                service: service_name.clone(),
            },
            &method,
            &service_name,
            &request_id,
            started,
        );
    };

    // 3. Lazily created breaker; first registration fixes its options.
    let breaker = state.breakers.get_or_create(
        &service_name,
        BreakerOptions {
            threshold: instance.config.breaker_threshold,
            cooldown: Duration::from_millis(instance.config.breaker_cooldown_ms),
        },
    );

    // 4. Buffer the body so the forwarder can replay it across retries.
    let (parts, body) = request.into_parts();
    let body_bytes = if method == Method::GET || method == Method::HEAD {
        None
    } else {
        match to_bytes(body, MAX_REQUEST_BYTES).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Failed to buffer request body");
                return respond(
                    GatewayError::Proxy {
                        service: service_name.clone(),
                        source: crate::proxy::error::ProxyError::BodyRead(e.to_string()),
                    },
                    &method,
                    &service_name,
                    &request_id,
                    started,
                );
            }
        }
    };

    // 5. One breaker-guarded proxy call; internal retries stay inside it.
    let headers: HeaderMap = parts.headers;
    let result = breaker
        .execute(|| {
            forwarder::forward(
                &state.client,
                &instance.config,
                method.clone(),
                &path_and_query,
                &headers,
                body_bytes,
                &request_id,
            )
        })
        .await;

    match result {
        Ok(response) => {
            let status = response.status();
            metrics::record_request(method.as_str(), status.as_u16(), &service_name, started);
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                service = %service_name,
                status = status.as_u16(),
                latency_ms = started.elapsed().as_millis() as u64,
                "Proxied request"
            );
            response
        }
        Err(BreakerError::Open) => {
            metrics::record_breaker_rejection(&service_name);
            respond(
                GatewayError::CircuitOpen {
                    service: service_name.clone(),
                },
                &method,
                &service_name,
                &request_id,
                started,
            )
        }
        Err(BreakerError::Inner(source)) => respond(
            GatewayError::Proxy {
                service: service_name.clone(),
                source,
            },
            &method,
            &service_name,
            &request_id,
            started,
        ),
    }
}

/// Convert a gateway error into its JSON response, recording metrics and the
/// access log entry on the way out.
fn respond(
    error: GatewayError,
    method: &Method,
    service: &str,
    request_id: &str,
    started: Instant,
) -> Response {
    let status = error.status();
    metrics::record_request(method.as_str(), status.as_u16(), service, started);
    tracing::info!(
        request_id = %request_id,
        method = %method,
        service = %service,
        status = status.as_u16(),
        code = error.code(),
        latency_ms = started.elapsed().as_millis() as u64,
        "Request rejected"
    );
    error.into_response()
}
