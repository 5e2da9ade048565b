use std::path::Path;

use serde::{Deserialize, Serialize};

use plexsync_core::{DomainError, JobId};
use plexsync_infra::jobs::{Job, JobStats, JobStatus, SubmittedJob};

pub const DEFAULT_LIST_LIMIT: usize = 50;
pub const MAX_LIST_LIMIT: usize = 500;

/// Body of `POST /api/download`.
#[derive(Debug, Deserialize)]
pub struct DownloadRequest {
    /// Older clients send `spotify_url`.
    #[serde(default, alias = "spotify_url")]
    pub source_url: String,
}

#[derive(Debug, Serialize)]
pub struct DownloadAccepted {
    pub status: &'static str,
    pub job_id: JobId,
    pub source_url: String,
    pub output_dir: String,
    pub message: String,
}

impl DownloadAccepted {
    pub fn new(job: &SubmittedJob, output_dir: &Path) -> Self {
        Self {
            status: "started",
            job_id: job.job_id,
            source_url: job.source_url.to_string(),
            output_dir: output_dir.display().to_string(),
            message: format!("Download started; poll /api/jobs/{} for progress", job.job_id),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ListJobsQuery {
    pub status: Option<String>,
    pub limit: Option<usize>,
}

impl ListJobsQuery {
    pub fn status(&self) -> Result<Option<JobStatus>, DomainError> {
        self.status.as_deref().map(str::parse).transpose()
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub output_dir: String,
    pub output_dir_exists: bool,
    pub downloader_ready: bool,
    pub jobs: JobStats,
}
