//! Validated media-source URL.

use serde::{Serialize, Serializer};
use url::Url;

use crate::error::{DomainError, DomainResult};

/// Domain marker a source URL must carry unless configured otherwise.
pub const DEFAULT_SOURCE_DOMAIN: &str = "spotify.com";

/// A URL that points at the configured media source.
///
/// Only `http`/`https` URLs whose host is the source domain (or a subdomain
/// of it, e.g. `open.spotify.com`) are accepted. The submitted text is kept
/// as-is (trimmed) so it can be echoed back to clients and handed to the
/// downloader unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUrl {
    raw: String,
    url: Url,
}

impl SourceUrl {
    pub fn parse(input: &str, domain: &str) -> DomainResult<Self> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(DomainError::validation("source_url is required"));
        }

        let url = Url::parse(raw)
            .map_err(|e| DomainError::validation(format!("malformed source_url: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(DomainError::validation(format!(
                "unsupported scheme '{}'; expected http or https",
                url.scheme()
            )));
        }

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let domain = domain.to_ascii_lowercase();
        let on_domain = host == domain || host.ends_with(&format!(".{domain}"));
        if !on_domain {
            return Err(DomainError::validation(format!(
                "invalid source URL; must be a {domain} link"
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            url,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl core::fmt::Display for SourceUrl {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for SourceUrl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}
