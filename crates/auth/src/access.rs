//! Shared-secret access keys.

use subtle::ConstantTimeEq;
use thiserror::Error;

/// Request header carrying the access key.
pub const ACCESS_KEY_HEADER: &str = "x-api-key";

/// A configured shared secret.
///
/// `Debug` never prints the secret itself.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessKey(String);

impl AccessKey {
    pub fn new(secret: impl Into<String>) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(AuthError::EmptySecret);
        }
        Ok(Self(secret))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("AccessKey(***)")
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing access credential")]
    Missing,

    #[error("invalid access credential")]
    Invalid,

    #[error("access key must not be empty")]
    EmptySecret,
}

/// Validates a credential presented by a caller.
pub trait CredentialValidator: Send + Sync + 'static {
    fn validate(&self, presented: Option<&str>) -> Result<(), AuthError>;
}

/// Compares the presented value against a single shared secret.
#[derive(Debug, Clone)]
pub struct SharedSecretValidator {
    key: AccessKey,
}

impl SharedSecretValidator {
    pub fn new(key: AccessKey) -> Self {
        Self { key }
    }
}

impl CredentialValidator for SharedSecretValidator {
    fn validate(&self, presented: Option<&str>) -> Result<(), AuthError> {
        let presented = presented.ok_or(AuthError::Missing)?;
        let matches: bool = presented.as_bytes().ct_eq(self.key.expose().as_bytes()).into();
        if matches {
            Ok(())
        } else {
            tracing::debug!("rejected access credential");
            Err(AuthError::Invalid)
        }
    }
}
