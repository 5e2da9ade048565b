//! Tracing and logging setup shared by the binaries.

pub use self::tracing::{init, LogFormat};

/// Tracing configuration (filters, layers).
pub mod tracing;
