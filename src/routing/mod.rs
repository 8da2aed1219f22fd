//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Compile patterns (exact strings, fixed prefixes)
//!     → Freeze as immutable RouteTable
//!
//! Incoming Request (path):
//!     → table.rs resolve()
//!     → Return: service name or explicit no-match
//! ```
//!
//! # Design Decisions
//! - Deterministic: same path always resolves the same entry
//! - Gateway-own endpoints bypass the table entirely (handled by the
//!   server's explicit routes before the wildcard fallback)
//! - Explicit no-match rather than silent default

pub mod table;

pub use table::RouteTable;
