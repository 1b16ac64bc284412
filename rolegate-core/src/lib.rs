//! Rolegate Core - shared infrastructure for the rolegate workspace
//!
//! Error types with context, logging bootstrap and the TOML configuration
//! that every other crate is built from.

pub mod config;
pub mod error;
pub mod logging;

pub use config::*;
pub use error::*;
pub use logging::*;

// Re-export commonly used external types
pub use tracing;
