//! Structured logging initialization.
//!
//! Uses `tracing` with an env-filter: `RUST_LOG` wins when set, otherwise
//! the configured log level applies to the gateway's own targets.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
pub fn init(log_level: &str) {
    let default_filter = format!("rental_gateway={log_level},tower_http={log_level}");
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
