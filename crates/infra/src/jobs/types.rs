//! Core job types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plexsync_core::{DomainError, JobId};

use crate::source::DownloadReport;

/// Job execution status.
///
/// Transitions are one-directional: `Processing -> Completed` or
/// `Processing -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Accepted and running (or waiting between attempts)
    Processing,
    /// Finished; `result` is populated
    Completed,
    /// Finished; `error` is populated
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl core::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for JobStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(DomainError::validation(format!(
                "unknown status '{other}'; expected processing, completed or failed"
            ))),
        }
    }
}

/// One timestamped progress line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Human-readable outcome of a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Tracks written to the output directory
    pub downloaded: usize,
    /// Tracks that could not be downloaded (partial failure)
    pub failed: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_tracks: Vec<String>,
    pub message: String,
}

impl JobSummary {
    pub fn from_report(report: &DownloadReport) -> Self {
        let downloaded = report.succeeded.len();
        let failed = report.failed.len();
        let message = if failed == 0 {
            format!("Downloaded {downloaded} track(s)")
        } else {
            format!(
                "Downloaded {downloaded} of {} track(s); {failed} failed",
                report.total()
            )
        };

        Self {
            downloaded,
            failed,
            failed_tracks: report
                .failed
                .iter()
                .map(|f| format!("{}: {}", f.track, f.error.message()))
                .collect(),
            message,
        }
    }
}

/// Terminal write for a job: exactly one of result or error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobSummary),
    Failed(String),
}

impl JobOutcome {
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed(error.into())
    }

    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Completed(_) => JobStatus::Completed,
            JobOutcome::Failed(_) => JobStatus::Failed,
        }
    }
}

/// A submitted download job as seen by pollers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: JobId,
    pub status: JobStatus,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Append-only progress log
    pub logs: Vec<LogLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JobSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    /// Create a new job in `Processing` with an empty log.
    pub fn new(id: JobId, source_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Processing,
            source_url: source_url.into(),
            created_at: now,
            updated_at: now,
            logs: Vec::new(),
            result: None,
            error: None,
        }
    }

    /// Append a log line stamped with the current time.
    pub fn push_log(&mut self, message: impl Into<String>) {
        let now = Utc::now();
        self.logs.push(LogLine {
            timestamp: now,
            message: message.into(),
        });
        self.updated_at = now;
    }

    /// Apply the terminal outcome.
    ///
    /// Returns `false` (and changes nothing) if the job already finished.
    pub fn finish(&mut self, outcome: JobOutcome) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        self.status = outcome.status();
        match outcome {
            JobOutcome::Completed(summary) => self.result = Some(summary),
            JobOutcome::Failed(error) => self.error = Some(error),
        }
        self.updated_at = Utc::now();
        true
    }
}
