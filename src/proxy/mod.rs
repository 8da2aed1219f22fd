//! Proxy subsystem: the request-handling core.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, gateway-own endpoints, middleware)
//!     → routing table resolves the service
//!     → health snapshot gates availability
//!     → circuit breaker guards the call
//!     → forwarder.rs (headers, retries, response translation)
//!     → error.rs (structured JSON on any failure)
//! ```

pub mod error;
pub mod forwarder;
pub mod server;

pub use error::{GatewayError, ProxyError};
pub use server::{AppState, GatewayServer};
