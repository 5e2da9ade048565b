//! Items exchanged with the media source.

use serde::{Deserialize, Serialize};

use super::error::SourceError;

/// One downloadable item (a song) resolved from a source URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
    pub url: String,
}

impl Track {
    pub fn new(name: impl Into<String>, artists: Vec<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artists,
            url: url.into(),
        }
    }
}

impl core::fmt::Display for Track {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.artists.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{} - {}", self.artists.join(", "), self.name)
        }
    }
}

/// A track that could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedTrack {
    pub track: Track,
    pub error: SourceError,
}

/// Per-item outcome of a download phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub succeeded: Vec<Track>,
    pub failed: Vec<FailedTrack>,
}

impl DownloadReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// Turn a report where nothing succeeded into a phase failure.
    ///
    /// The failure is rate-limited if any item was, so the caller backs off
    /// accordingly; otherwise it is transient.
    pub fn into_result(self) -> Result<Self, SourceError> {
        if !self.succeeded.is_empty() || self.failed.is_empty() {
            return Ok(self);
        }

        let first = self
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.track, f.error.message()))
            .next()
            .unwrap_or_default();
        let message = format!("all {} track(s) failed to download ({first})", self.failed.len());

        match self.failed.iter().find(|f| f.error.is_rate_limited()) {
            Some(limited) => Err(SourceError::RateLimited {
                message,
                retry_after: limited.error.retry_after(),
            }),
            None => Err(SourceError::Transient(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(n: &str) -> Track {
        Track::new(n, vec!["Artist".into()], format!("https://open.spotify.com/track/{n}"))
    }

    #[test]
    fn display_includes_artists() {
        assert_eq!(track("Song").to_string(), "Artist - Song");
        assert_eq!(Track::new("Solo", vec![], "u").to_string(), "Solo");
    }

    #[test]
    fn partial_report_is_success() {
        let report = DownloadReport {
            succeeded: vec![track("a")],
            failed: vec![FailedTrack {
                track: track("b"),
                error: SourceError::transient("boom"),
            }],
        };
        assert_eq!(report.clone().into_result(), Ok(report));
    }

    #[test]
    fn all_failed_report_is_an_error() {
        let report = DownloadReport {
            succeeded: vec![],
            failed: vec![FailedTrack {
                track: track("a"),
                error: SourceError::transient("boom"),
            }],
        };
        let err = report.into_result().unwrap_err();
        assert!(matches!(err, SourceError::Transient(msg) if msg.contains("all 1 track(s)")));
    }

    #[test]
    fn all_failed_with_rate_limit_backs_off() {
        let report = DownloadReport {
            succeeded: vec![],
            failed: vec![
                FailedTrack {
                    track: track("a"),
                    error: SourceError::transient("boom"),
                },
                FailedTrack {
                    track: track("b"),
                    error: SourceError::rate_limited("429"),
                },
            ],
        };
        assert!(report.into_result().unwrap_err().is_rate_limited());
    }
}
