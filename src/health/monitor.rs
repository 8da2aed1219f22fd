//! Periodic health probing.
//!
//! # Responsibilities
//! - Probe every configured service concurrently on each tick
//! - Keep the per-service ServiceHealth snapshots current
//! - Emit ServiceUp/ServiceDown events when the healthy flag flips
//!
//! # Design Decisions
//! - One probe per service per tick; a failed probe is never retried
//!   inline, the next tick corrects it
//! - Probe failures stay inside the monitor; request handling only ever
//!   sees the snapshot
//! - stop() cancels the timer but lets the in-flight cycle finish

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Request;
use dashmap::DashMap;
use futures_util::future::join_all;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time;

use crate::config::{HealthCheckConfig, ServiceConfig};
use crate::health::state::{now_ms, HealthEvent, HealthStats, ServiceHealth, ServiceInstance};
use crate::observability::metrics;
use crate::registry::ServiceRegistry;

/// Owns the probe loop and the mutable health snapshots.
pub struct HealthMonitor {
    registry: Arc<ServiceRegistry>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
    snapshots: DashMap<String, ServiceHealth>,
    events: broadcast::Sender<HealthEvent>,
    shutdown: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<ServiceRegistry>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let snapshots = DashMap::new();
        for service in registry.all() {
            snapshots.insert(
                service.name.clone(),
                ServiceHealth::unknown(&service.name, &service.url),
            );
        }

        let (events, _) = broadcast::channel(64);
        let (shutdown, _) = broadcast::channel(1);

        Self {
            registry,
            config,
            client,
            snapshots,
            events,
            shutdown,
            task: Mutex::new(None),
        }
    }

    /// Subscribe to healthy-flag flip events.
    pub fn subscribe(&self) -> broadcast::Receiver<HealthEvent> {
        self.events.subscribe()
    }

    /// Start the recurring probe loop. No-op if already running.
    pub async fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        tracing::info!(
            interval_ms = self.config.interval_ms,
            timeout_ms = self.config.timeout_ms,
            services = self.registry.len(),
            "Health monitor starting"
        );

        let monitor = self.clone();
        let mut shutdown = self.shutdown.subscribe();
        *task = Some(tokio::spawn(async move {
            let mut ticker = time::interval(Duration::from_millis(monitor.config.interval_ms));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.check_all().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Health monitor received stop signal, exiting loop");
                        break;
                    }
                }
            }
        }));
    }

    /// Cancel the probe timer. In-flight probes run to completion.
    pub async fn stop(&self) {
        let mut task = self.task.lock().await;
        if task.take().is_some() {
            let _ = self.shutdown.send(());
        }
    }

    /// Run one probe cycle: fan out to every service concurrently, each
    /// probe completing independently of the others.
    pub async fn check_all(&self) {
        let services: Vec<Arc<ServiceConfig>> = self.registry.all().cloned().collect();
        join_all(services.iter().map(|service| self.probe(service))).await;
    }

    /// Probe one service and record the outcome unconditionally.
    async fn probe(&self, service: &ServiceConfig) {
        let uri = format!(
            "{}{}",
            service.url.trim_end_matches('/'),
            service.health_path
        );

        let started = Instant::now();
        let outcome = match Request::builder()
            .method("GET")
            .uri(&uri)
            .header("user-agent", "rental-gateway-health")
            .body(Body::empty())
        {
            Ok(request) => {
                let timeout = Duration::from_millis(self.config.timeout_ms);
                // Dropping the in-flight future on expiry cancels the probe.
                match time::timeout(timeout, self.client.request(request)).await {
                    Ok(Ok(response)) if response.status().is_success() => Ok(()),
                    Ok(Ok(response)) => Err(format!("unexpected status {}", response.status())),
                    Ok(Err(e)) => Err(format!("connection error: {e}")),
                    Err(_) => Err(format!("probe timed out after {}ms", self.config.timeout_ms)),
                }
            }
            Err(e) => Err(format!("invalid probe request: {e}")),
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        self.record(service, outcome, elapsed_ms);
    }

    fn record(&self, service: &ServiceConfig, outcome: Result<(), String>, elapsed_ms: u64) {
        let healthy = outcome.is_ok();
        let error = outcome.err();

        let mut entry = self
            .snapshots
            .entry(service.name.clone())
            .or_insert_with(|| ServiceHealth::unknown(&service.name, &service.url));
        let was_healthy = entry.healthy;

        entry.healthy = healthy;
        entry.last_check_ms = Some(now_ms());
        entry.response_time_ms = Some(elapsed_ms);
        entry.last_error = error.clone();
        drop(entry);

        metrics::record_service_health(&service.name, healthy);

        if healthy == was_healthy {
            return;
        }

        if healthy {
            tracing::info!(service = %service.name, response_ms = elapsed_ms, "Service recovered");
            let _ = self.events.send(HealthEvent::ServiceUp {
                name: service.name.clone(),
            });
        } else {
            let error = error.unwrap_or_default();
            tracing::warn!(service = %service.name, error = %error, "Service went down");
            let _ = self.events.send(HealthEvent::ServiceDown {
                name: service.name.clone(),
                error,
            });
        }
    }

    /// Resolve a service only if its current snapshot is healthy.
    /// Independent of circuit-breaker state.
    pub fn get_healthy_service(&self, name: &str) -> Option<ServiceInstance> {
        let config = self.registry.get(name)?;
        let health = self.snapshots.get(name)?.clone();
        health.healthy.then_some(ServiceInstance { config, health })
    }

    /// Names of services whose snapshot is currently healthy. Breaker state
    /// plays no part in this partition.
    pub fn healthy_services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .snapshots
            .iter()
            .filter(|e| e.value().healthy)
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Current snapshot for every tracked service.
    pub fn all_health(&self) -> Vec<ServiceHealth> {
        let mut all: Vec<ServiceHealth> =
            self.snapshots.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    /// Aggregate healthy/unhealthy counts.
    pub fn stats(&self) -> HealthStats {
        let total = self.snapshots.len();
        let healthy = self.snapshots.iter().filter(|e| e.value().healthy).count();
        let healthy_percent = if total == 0 {
            100.0
        } else {
            healthy as f64 * 100.0 / total as f64
        };
        HealthStats {
            total,
            healthy,
            unhealthy: total - healthy,
            healthy_percent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;

    fn service(name: &str, url: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.into(),
            url: url.into(),
            health_path: "/health".into(),
            timeout_ms: 1_000,
            retries: 0,
            breaker_threshold: 5,
            breaker_cooldown_ms: 60_000,
        }
    }

    fn monitor(services: Vec<ServiceConfig>) -> Arc<HealthMonitor> {
        let registry = Arc::new(ServiceRegistry::new(services));
        Arc::new(HealthMonitor::new(
            registry,
            HealthCheckConfig {
                enabled: true,
                interval_ms: 50,
                timeout_ms: 200,
            },
        ))
    }

    #[test]
    fn unknown_services_start_routable() {
        let m = monitor(vec![service("booking", "http://127.0.0.1:1")]);
        let instance = m.get_healthy_service("booking").unwrap();
        assert!(instance.health.healthy);
        assert!(instance.health.last_check_ms.is_none());
    }

    #[test]
    fn unconfigured_service_resolves_to_nothing() {
        let m = monitor(vec![]);
        assert!(m.get_healthy_service("ghost").is_none());
    }

    #[tokio::test]
    async fn failed_probe_marks_service_down_and_emits_once() {
        // Nothing listens on this port: connection refused.
        let m = monitor(vec![service("booking", "http://127.0.0.1:9")]);
        let mut events = m.subscribe();

        m.check_all().await;
        assert!(m.get_healthy_service("booking").is_none());
        assert!(matches!(
            events.try_recv(),
            Ok(HealthEvent::ServiceDown { .. })
        ));

        // Re-confirmation of an unchanged state emits nothing.
        m.check_all().await;
        assert!(events.try_recv().is_err());

        let health = &m.all_health()[0];
        assert!(!health.healthy);
        assert!(health.last_error.is_some());
        assert!(health.last_check_ms.is_some());
    }

    #[tokio::test]
    async fn stats_partition_by_flag() {
        let m = monitor(vec![
            service("booking", "http://127.0.0.1:9"),
            service("listings", "http://127.0.0.1:9"),
        ]);
        let before = m.stats();
        assert_eq!(before.healthy, 2);
        assert_eq!(before.healthy_percent, 100.0);

        m.check_all().await;
        let after = m.stats();
        assert_eq!(after.total, 2);
        assert_eq!(after.healthy, 0);
        assert_eq!(after.unhealthy, 2);
        assert_eq!(after.healthy_percent, 0.0);
    }

    #[tokio::test]
    async fn healthy_partition_ignores_everything_but_the_flag() {
        let m = monitor(vec![
            // svc_a's probe succeeds against a live listener below.
            service("svc_b", "http://127.0.0.1:9"),
            service("svc_a", "http://127.0.0.1:29301"),
        ]);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:29301")
            .await
            .unwrap();
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            while let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                    .await;
            }
        });

        m.check_all().await;
        assert_eq!(m.healthy_services(), vec!["svc_a".to_string()]);
    }

    #[tokio::test]
    async fn start_is_idempotent_and_stop_cancels() {
        let m = monitor(vec![service("booking", "http://127.0.0.1:9")]);
        m.start().await;
        m.start().await;
        assert!(m.task.lock().await.is_some());
        m.stop().await;
        assert!(m.task.lock().await.is_none());
    }
}
