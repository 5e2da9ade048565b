//! Media source collaborator: the thing that actually finds and fetches audio.
//!
//! ## Components
//!
//! - `MediaSource`: `search(url)` and `download(tracks)` against a live handle
//! - `SourceConnector`: builds a `MediaSource` (credentials, binary checks)
//! - `LazySource`: process-wide handle, connected at most once
//! - `SpotdlConnector`: the spotDL-backed implementation

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

pub mod error;
pub mod lazy;
pub mod spotdl;
pub mod types;

pub use error::SourceError;
pub use lazy::LazySource;
pub use spotdl::{SpotdlConfig, SpotdlConnector, SpotdlSource};
pub use types::{DownloadReport, FailedTrack, Track};

/// A connected media source.
///
/// Implementations must be safe to call concurrently from several jobs.
#[async_trait]
pub trait MediaSource: Send + Sync + 'static {
    /// Resolve a source URL (track, album, playlist, ...) into tracks.
    async fn search(&self, url: &str) -> Result<Vec<Track>, SourceError>;

    /// Download tracks into `output_dir`, reporting per-item outcomes.
    async fn download(&self, tracks: &[Track], output_dir: &Path) -> Result<DownloadReport, SourceError>;
}

/// Builds a connected `MediaSource`.
#[async_trait]
pub trait SourceConnector: Send + Sync + 'static {
    async fn connect(&self) -> Result<Arc<dyn MediaSource>, SourceError>;
}
