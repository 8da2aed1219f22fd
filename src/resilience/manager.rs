//! Keyed registry of circuit breakers.
//!
//! # Responsibilities
//! - One live breaker per service name, created on demand
//! - Administrative reset (single or all)
//! - Aggregate stats and healthy/unhealthy partitions
//!
//! # Design Decisions
//! - First registration wins: `get_or_create` ignores options for an
//!   existing breaker rather than silently reconfiguring it
//! - DashMap gives per-entry locking so unrelated services never serialize

use std::sync::Arc;

use dashmap::DashMap;

use crate::resilience::circuit_breaker::{BreakerOptions, BreakerStats, CircuitBreaker};

/// Registry of per-service circuit breakers.
#[derive(Debug, Default)]
pub struct CircuitBreakerManager {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl CircuitBreakerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the breaker for `name`, creating it with `options` on first
    /// use. An existing breaker is returned unchanged; `options` is ignored.
    pub fn get_or_create(&self, name: &str, options: BreakerOptions) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(name, options)))
            .clone()
    }

    /// Return the breaker for `name` if one exists. Never creates.
    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.value().clone())
    }

    /// Reset a single breaker to Closed. Returns false if unknown.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    /// Reset every registered breaker to Closed.
    pub fn reset_all(&self) {
        for entry in self.breakers.iter() {
            entry.value().reset();
        }
    }

    /// Stats snapshot for every registered breaker.
    pub fn all_stats(&self) -> Vec<BreakerStats> {
        self.breakers
            .iter()
            .map(|entry| entry.value().stats())
            .collect()
    }

    /// Names of services whose breaker is Closed.
    pub fn healthy_services(&self) -> Vec<String> {
        self.breakers
            .iter()
            .filter(|entry| entry.value().is_closed())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Names of services whose breaker is Open or Half-Open.
    pub fn unhealthy_services(&self) -> Vec<String> {
        self.breakers
            .iter()
            .filter(|entry| !entry.value().is_closed())
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn first_registration_wins() {
        let manager = CircuitBreakerManager::new();
        let first = manager.get_or_create(
            "booking",
            BreakerOptions {
                threshold: 2,
                cooldown: Duration::from_millis(100),
            },
        );
        let second = manager.get_or_create(
            "booking",
            BreakerOptions {
                threshold: 99,
                cooldown: Duration::from_secs(999),
            },
        );
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.stats().threshold, 2);
    }

    #[test]
    fn get_never_creates() {
        let manager = CircuitBreakerManager::new();
        assert!(manager.get("booking").is_none());
        manager.get_or_create("booking", BreakerOptions::default());
        assert!(manager.get("booking").is_some());
    }

    #[tokio::test]
    async fn partitions_by_breaker_state() {
        let manager = CircuitBreakerManager::new();
        let open = manager.get_or_create(
            "payments",
            BreakerOptions {
                threshold: 1,
                cooldown: Duration::from_secs(60),
            },
        );
        manager.get_or_create("booking", BreakerOptions::default());

        let _ = open.execute(|| async { Err::<(), _>("down") }).await;
        assert!(open.is_open());

        assert_eq!(manager.healthy_services(), vec!["booking".to_string()]);
        assert_eq!(manager.unhealthy_services(), vec!["payments".to_string()]);

        manager.reset_all();
        assert!(manager.unhealthy_services().is_empty());
    }

    #[test]
    fn reset_unknown_is_reported() {
        let manager = CircuitBreakerManager::new();
        assert!(!manager.reset("ghost"));
    }
}
