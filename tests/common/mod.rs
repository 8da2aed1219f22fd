//! Shared utilities for gateway integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use rental_gateway::config::{GatewayConfig, RouteConfig, ServiceConfig};
use rental_gateway::lifecycle::Shutdown;
use rental_gateway::proxy::GatewayServer;

/// Start a simple mock backend that returns a fixed 200 response.
#[allow(dead_code)]
pub async fn start_mock_backend(addr: SocketAddr, response: &'static str) {
    start_programmable_backend(addr, move || async move { (200, response.to_string()) }).await;
}

/// Start a programmable mock backend with async support.
pub async fn start_programmable_backend<F, Fut>(addr: SocketAddr, f: F)
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await.unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// A service definition with fast test-friendly timeouts.
pub fn service(name: &str, addr: SocketAddr) -> ServiceConfig {
    ServiceConfig {
        name: name.into(),
        url: format!("http://{addr}"),
        health_path: "/health".into(),
        timeout_ms: 1_000,
        retries: 0,
        breaker_threshold: 5,
        breaker_cooldown_ms: 60_000,
    }
}

pub fn route(pattern: &str, service: &str) -> RouteConfig {
    RouteConfig {
        pattern: pattern.into(),
        service: service.into(),
    }
}

/// Spawn a gateway on `proxy_addr` for the given config. Returns the
/// shutdown coordinator; dropping it does not stop the server, call
/// `trigger()` at the end of the test.
pub async fn spawn_gateway(proxy_addr: SocketAddr, mut config: GatewayConfig) -> Shutdown {
    config.listener.bind_address = proxy_addr.to_string();

    let shutdown = Shutdown::new();
    let server = GatewayServer::new(config);
    let listener = TcpListener::bind(proxy_addr).await.unwrap();
    let server_shutdown: broadcast::Receiver<()> = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    // Give the listener a moment to start serving.
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

/// A reqwest client that never reuses pooled connections between tests.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
