//! Classified downstream failures.

use std::time::Duration;

use thiserror::Error;

/// A failure reported by the media source.
///
/// The retry controller branches on the variant, never on message text:
/// - `RateLimited`: throttled by the remote service; long backoff
/// - `Transient`: anything else that may succeed on a later attempt
/// - `Fatal`: retrying cannot help (missing binary, unusable output, ...)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// Wait suggested by the remote service, if it sent one.
        retry_after: Option<Duration>,
    },

    #[error("{0}")]
    Transient(String),

    #[error("{0}")]
    Fatal(String),
}

impl SourceError {
    /// Default classifier: HTTP 429, a standalone `429` or `rate` (any case)
    /// in the failure text means rate limiting. Everything else is transient.
    ///
    /// A wait hint in the text (`Retry will occur after: N s` from the Spotify
    /// client, or an echoed `Retry-After: N` header) is kept as `retry_after`.
    pub fn classify(status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        if status == Some(429) || looks_rate_limited(&message) {
            let retry_after = retry_after_hint(&message);
            Self::RateLimited {
                message,
                retry_after,
            }
        } else {
            Self::Transient(message)
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::RateLimited { message, .. } => message,
            Self::Transient(message) | Self::Fatal(message) => message,
        }
    }
}

const RETRY_HINT_MARKERS: [&str; 2] = ["retry will occur after:", "retry-after:"];

fn looks_rate_limited(message: &str) -> bool {
    mentions_status_429(message) || message.to_ascii_lowercase().contains("rate")
}

/// `429` as a number of its own, not a fragment of an id, path or longer number.
fn mentions_status_429(message: &str) -> bool {
    let bytes = message.as_bytes();
    let joins = |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'/' | b'.' | b'_' | b'-' | b'%' | b'&' | b'?');

    message.match_indices("429").any(|(i, _)| {
        let before = i.checked_sub(1).map(|j| bytes[j]);
        let after = bytes.get(i + 3).copied();
        !before.is_some_and(joins) && !after.is_some_and(joins)
    })
}

/// Seconds to wait, if the failure text carries a hint.
fn retry_after_hint(message: &str) -> Option<Duration> {
    let lower = message.to_ascii_lowercase();
    RETRY_HINT_MARKERS.iter().find_map(|marker| {
        let rest = &lower[lower.find(marker)? + marker.len()..];
        let digits: String = rest
            .trim_start()
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        digits.parse().ok().map(Duration::from_secs)
    })
}
