//! Per-service health snapshots and change events.
//!
//! # Design Decisions
//! - Snapshots are owned and mutated only by the monitor; everything else
//!   reads clones (eventually consistent, up to one probe interval stale)
//! - Events fire only on healthy-flag flips, never on re-confirmation
//! - Probe-based health is independent of circuit breaker state

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::config::ServiceConfig;

/// Mutable liveness snapshot for one backend service.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub name: String,
    pub url: String,
    pub healthy: bool,
    /// Unix epoch milliseconds of the last completed probe.
    pub last_check_ms: Option<u64>,
    /// Duration of the last probe in milliseconds.
    pub response_time_ms: Option<u64>,
    /// Failure description from the last probe, if it failed.
    pub last_error: Option<String>,
}

impl ServiceHealth {
    /// Snapshot for a service no probe has completed against yet.
    /// Optimistic: routable until proven down.
    pub fn unknown(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            healthy: true,
            last_check_ms: None,
            response_time_ms: None,
            last_error: None,
        }
    }
}

/// A service's static configuration paired with its current health snapshot.
#[derive(Debug, Clone)]
pub struct ServiceInstance {
    pub config: Arc<ServiceConfig>,
    pub health: ServiceHealth,
}

/// Emitted by the monitor when a service's healthy flag flips.
#[derive(Debug, Clone)]
pub enum HealthEvent {
    ServiceUp { name: String },
    ServiceDown { name: String, error: String },
}

/// Aggregate counts across all tracked services.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStats {
    pub total: usize,
    pub healthy: usize,
    pub unhealthy: usize,
    pub healthy_percent: f64,
}

/// Current unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
