//! Infrastructure layer: job execution, storage and the external downloader.

pub mod jobs;
pub mod source;
