//! `plexsync-core`: domain primitives shared by every layer.
//!
//! This crate contains **pure domain** types (no I/O, no runtime).

pub mod error;
pub mod id;
pub mod source_url;

pub use error::{DomainError, DomainResult};
pub use id::JobId;
pub use source_url::{SourceUrl, DEFAULT_SOURCE_DOMAIN};
