//! Runs one download job end-to-end.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use plexsync_core::JobId;

use super::retry::{RetryController, RetryPolicy};
use super::store::JobStore;
use super::types::{JobOutcome, JobStatus, JobSummary};
use crate::source::{LazySource, SourceError, Track};

/// Ensure `dir` exists. Succeeds if it already does.
pub async fn prepare_output_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}

/// Job executor.
///
/// Owns nothing per job: every call to [`JobExecutor::execute`] works on the
/// record identified by its `job_id` and writes exactly one terminal outcome.
pub struct JobExecutor {
    store: Arc<dyn JobStore>,
    source: Arc<LazySource>,
    controller: RetryController,
    output_dir: PathBuf,
}

impl JobExecutor {
    pub fn new(
        store: Arc<dyn JobStore>,
        source: Arc<LazySource>,
        policy: RetryPolicy,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            source,
            controller: RetryController::new(policy),
            output_dir: output_dir.into(),
        }
    }

    /// Run the job and record its terminal state.
    pub async fn execute(&self, job_id: JobId, url: &str) -> JobStatus {
        info!(%job_id, %url, "job started");
        self.log(job_id, format!("Starting download for: {url}"));

        let outcome = self.run(job_id, url).await;
        self.finish(job_id, outcome)
    }

    /// Write the terminal outcome, logging it to the job first.
    ///
    /// A job that already finished keeps its first outcome.
    pub fn finish(&self, job_id: JobId, outcome: JobOutcome) -> JobStatus {
        match &outcome {
            JobOutcome::Completed(summary) => self.log(job_id, summary.message.clone()),
            JobOutcome::Failed(error) => self.log(job_id, format!("Job failed: {error}")),
        }

        let status = outcome.status();
        match self.store.set_terminal(job_id, outcome) {
            Ok(job) => {
                info!(%job_id, status = %job.status, "job finished");
                job.status
            }
            Err(e) => {
                warn!(%job_id, error = %e, "terminal write rejected");
                status
            }
        }
    }

    async fn run(&self, job_id: JobId, url: &str) -> JobOutcome {
        let dir = self.output_dir.as_path();
        if let Err(e) = prepare_output_dir(dir).await {
            error!(%job_id, dir = %dir.display(), error = %e, "cannot prepare output directory");
            return JobOutcome::failed(format!(
                "cannot create output directory {}: {e}",
                dir.display()
            ));
        }
        self.log(job_id, format!("Output directory ready: {}", dir.display()));

        let source = match self.source.get().await {
            Ok(source) => source,
            Err(e) => {
                error!(%job_id, error = %e, "media source unavailable");
                return JobOutcome::failed(format!("downloader unavailable: {e}"));
            }
        };

        let log = |message: String| self.log(job_id, message);
        let source = &source;

        let search = || async move {
            log(format!("Searching {url}"));
            let tracks = source.search(url).await?;
            if tracks.is_empty() {
                return Err(SourceError::fatal(format!("no tracks found for {url}")));
            }
            log(format!("Found {} track(s)", tracks.len()));
            Ok::<_, SourceError>(tracks)
        };

        let download = |tracks: Vec<Track>| async move {
            log(format!("Downloading {} track(s) to {}", tracks.len(), dir.display()));
            let report = source.download(&tracks, dir).await?;
            for failed in &report.failed {
                log(format!("Failed: {}: {}", failed.track, failed.error.message()));
            }
            report.into_result()
        };

        match self.controller.run(search, download, &log).await {
            Ok(report) => JobOutcome::Completed(JobSummary::from_report(&report)),
            Err(e) => JobOutcome::failed(e.to_string()),
        }
    }

    fn log(&self, job_id: JobId, message: String) {
        info!(%job_id, "{message}");
        self.store.append_log(job_id, &message);
    }
}

impl core::fmt::Debug for JobExecutor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobExecutor")
            .field("source", &self.source)
            .field("policy", self.controller.policy())
            .field("output_dir", &self.output_dir)
            .finish()
    }
}
