//! Semantic configuration checks.
//!
//! Serde handles the syntactic layer; everything here is about internal
//! consistency: routes must reference defined services, service names must be
//! unique, URLs must parse, thresholds must be non-zero.

use std::collections::HashSet;

use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic validation failure.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duplicate service name: {0}")]
    DuplicateService(String),

    #[error("service {name}: invalid base url {url}")]
    InvalidUrl { name: String, url: String },

    #[error("service {0}: health path must start with '/'")]
    BadHealthPath(String),

    #[error("service {0}: breaker threshold must be at least 1")]
    ZeroThreshold(String),

    #[error("route {pattern} references unknown service {service}")]
    UnknownService { pattern: String, service: String },

    #[error("route pattern must start with '/': {0}")]
    BadPattern(String),
}

/// Validate a parsed configuration, collecting every failure.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut names = HashSet::new();

    for service in &config.services {
        if !names.insert(service.name.as_str()) {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
        if Url::parse(&service.url).is_err() {
            errors.push(ValidationError::InvalidUrl {
                name: service.name.clone(),
                url: service.url.clone(),
            });
        }
        if !service.health_path.starts_with('/') {
            errors.push(ValidationError::BadHealthPath(service.name.clone()));
        }
        if service.breaker_threshold == 0 {
            errors.push(ValidationError::ZeroThreshold(service.name.clone()));
        }
    }

    for route in &config.routes {
        if !route.pattern.starts_with('/') {
            errors.push(ValidationError::BadPattern(route.pattern.clone()));
        }
        if !names.contains(route.service.as_str()) {
            errors.push(ValidationError::UnknownService {
                pattern: route.pattern.clone(),
                service: route.service.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, ServiceConfig};

    fn service(name: &str, url: &str) -> ServiceConfig {
        ServiceConfig {
            name: name.into(),
            url: url.into(),
            health_path: "/health".into(),
            timeout_ms: 30_000,
            retries: 3,
            breaker_threshold: 5,
            breaker_cooldown_ms: 60_000,
        }
    }

    #[test]
    fn accepts_consistent_config() {
        let mut config = GatewayConfig::default();
        config.services.push(service("booking", "http://127.0.0.1:3001"));
        config.routes.push(RouteConfig {
            pattern: "/api/bookings/*".into(),
            service: "booking".into(),
        });
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn rejects_route_to_unknown_service() {
        let mut config = GatewayConfig::default();
        config.routes.push(RouteConfig {
            pattern: "/api/bookings/*".into(),
            service: "booking".into(),
        });
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::UnknownService {
                pattern: "/api/bookings/*".into(),
                service: "booking".into(),
            }]
        );
    }

    #[test]
    fn rejects_duplicate_names_and_bad_urls() {
        let mut config = GatewayConfig::default();
        config.services.push(service("booking", "http://127.0.0.1:3001"));
        config.services.push(service("booking", "not a url"));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateService("booking".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidUrl { .. })));
    }
}
