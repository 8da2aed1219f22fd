//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate (fatal on error) → Build server → Serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl+C or trigger() → stop accepting → drain → stop probe loop
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
