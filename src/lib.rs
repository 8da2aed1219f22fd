//! Failure-isolating API gateway for the rental platform.
//!
//! Accepts inbound HTTP requests, resolves them to one of several
//! independently deployed backend services, tracks each backend's liveness
//! with a periodic probe loop, and protects the system from cascading
//! failure with per-service circuit breakers and a bounded retrying proxy.

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod observability;
pub mod proxy;
pub mod registry;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use lifecycle::Shutdown;
pub use proxy::GatewayServer;
