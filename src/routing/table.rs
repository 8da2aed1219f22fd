//! Compiled route table.
//!
//! # Responsibilities
//! - Compile configured (pattern, service) pairs at startup
//! - Resolve a request path to a service name
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Strict first-match-wins in table order; more specific prefixes must
//!   be listed before broader ones, the table does not reorder
//! - No regex: exact match or fixed-prefix wildcard only

use crate::config::RouteConfig;

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RoutePattern {
    /// Exact string match on the full path.
    Exact(String),
    /// Pattern ended in `*`: match any path starting with the fixed prefix.
    Prefix(String),
}

impl RoutePattern {
    fn compile(pattern: &str) -> Self {
        match pattern.strip_suffix('*') {
            Some(prefix) => Self::Prefix(prefix.to_string()),
            None => Self::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            Self::Exact(exact) => path == exact,
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
struct RouteEntry {
    pattern: RoutePattern,
    service: String,
}

/// Ordered path-pattern → service-name table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Compile the table, preserving configuration order.
    pub fn from_config(routes: &[RouteConfig]) -> Self {
        let entries = routes
            .iter()
            .map(|route| RouteEntry {
                pattern: RoutePattern::compile(&route.pattern),
                service: route.service.clone(),
            })
            .collect();
        Self { entries }
    }

    /// Resolve a path to the first matching entry's service name.
    pub fn resolve(&self, path: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.pattern.matches(path))
            .map(|entry| entry.service.as_str())
    }

    /// Number of compiled entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(routes: &[(&str, &str)]) -> RouteTable {
        let configs: Vec<RouteConfig> = routes
            .iter()
            .map(|(pattern, service)| RouteConfig {
                pattern: (*pattern).into(),
                service: (*service).into(),
            })
            .collect();
        RouteTable::from_config(&configs)
    }

    #[test]
    fn wildcard_matches_prefix_exact_matches_whole_path() {
        let t = table(&[("/api/a/*", "svc_a"), ("/api/b", "svc_b")]);

        assert_eq!(t.resolve("/api/a/x/y"), Some("svc_a"));
        assert_eq!(t.resolve("/api/b"), Some("svc_b"));
        // Exact entries do not match sub-paths.
        assert_eq!(t.resolve("/api/b/extra"), None);
        assert_eq!(t.resolve("/other"), None);
    }

    #[test]
    fn first_match_wins_in_table_order() {
        let t = table(&[("/api/bookings/reports/*", "reporting"), ("/api/bookings/*", "booking")]);
        assert_eq!(t.resolve("/api/bookings/reports/daily"), Some("reporting"));
        assert_eq!(t.resolve("/api/bookings/42"), Some("booking"));

        // Broader prefix first shadows the specific one; the table
        // deliberately does not correct the ordering.
        let shadowed = table(&[("/api/bookings/*", "booking"), ("/api/bookings/reports/*", "reporting")]);
        assert_eq!(shadowed.resolve("/api/bookings/reports/daily"), Some("booking"));
    }

    #[test]
    fn wildcard_prefix_excludes_the_bare_parent() {
        let t = table(&[("/api/a/*", "svc_a")]);
        assert_eq!(t.resolve("/api/a"), None);
        assert_eq!(t.resolve("/api/a/"), Some("svc_a"));
    }

    #[test]
    fn bare_wildcard_is_a_catch_all() {
        let t = table(&[("/api/b", "svc_b"), ("/*", "fallback")]);
        assert_eq!(t.resolve("/api/b"), Some("svc_b"));
        assert_eq!(t.resolve("/anything/else"), Some("fallback"));
    }

    #[test]
    fn empty_table_never_matches() {
        let t = table(&[]);
        assert!(t.is_empty());
        assert_eq!(t.resolve("/api/a"), None);
    }
}
