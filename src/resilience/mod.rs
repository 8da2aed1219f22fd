//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → circuit_breaker.rs (fail fast if the service circuit is open)
//!     → proxy call with per-service timeout
//!     → On network failure: bounded retries with backoff.rs delays
//!     → Net outcome recorded by the breaker as one success/failure
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - Retries are bounded and deterministic, never an unbounded loop
//! - The breaker sees one outcome per client request, never per attempt
//! - Breaker state is independent of probe-based health tracking

pub mod backoff;
pub mod circuit_breaker;
pub mod manager;

pub use circuit_breaker::{BreakerError, BreakerOptions, BreakerState, CircuitBreaker};
pub use manager::CircuitBreakerManager;
