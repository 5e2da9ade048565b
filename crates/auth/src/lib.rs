//! `plexsync-auth`: access-credential boundary.
//!
//! This crate is intentionally decoupled from HTTP: it only answers "is this
//! presented credential acceptable?".

pub mod access;

pub use access::{AccessKey, AuthError, CredentialValidator, SharedSecretValidator, ACCESS_KEY_HEADER};
