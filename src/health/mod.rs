//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Probe loop (monitor.rs):
//!     Periodic timer
//!     → One concurrent GET per service health endpoint
//!     → Update snapshot in state.rs unconditionally
//!     → Emit ServiceUp/ServiceDown only when the flag flips
//!
//! Request path:
//!     get_healthy_service(name)
//!     → snapshot read only; never blocks on probing
//! ```
//!
//! # Design Decisions
//! - Best-effort, eventually-consistent liveness view
//! - Probe outcomes and request outcomes are separate failure signals;
//!   the monitor never touches circuit breaker state
//! - Health state is per-service; one instance per service name

pub mod monitor;
pub mod state;

pub use monitor::HealthMonitor;
pub use state::{HealthEvent, HealthStats, ServiceHealth, ServiceInstance};
