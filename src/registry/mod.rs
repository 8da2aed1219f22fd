//! Static service registry.
//!
//! # Responsibilities
//! - Hold the immutable service name → ServiceConfig table
//! - Resolve a service name to its configuration during request handling
//!
//! # Design Decisions
//! - Built once at startup, never mutated (thread-safe without locks)
//! - Identity is the service name: one instance per name
//! - Mutable per-service state (health, breaker) lives elsewhere

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ServiceConfig;

/// Immutable lookup table of configured backend services.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<String, Arc<ServiceConfig>>,
}

impl ServiceRegistry {
    /// Build the registry from configuration. Later duplicates are rejected
    /// by config validation, so insertion order is irrelevant here.
    pub fn new(configs: Vec<ServiceConfig>) -> Self {
        let services = configs
            .into_iter()
            .map(|c| (c.name.clone(), Arc::new(c)))
            .collect();
        Self { services }
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<Arc<ServiceConfig>> {
        self.services.get(name).cloned()
    }

    /// Iterate over all configured services.
    pub fn all(&self) -> impl Iterator<Item = &Arc<ServiceConfig>> {
        self.services.values()
    }

    /// Number of configured services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True if no services are configured.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
