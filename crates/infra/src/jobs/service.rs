//! Job submission and lookup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use plexsync_core::{DomainError, JobId, SourceUrl};

use super::dispatcher::JobDispatcher;
use super::executor::prepare_output_dir;
use super::store::{JobStats, JobStore, JobStoreError};
use super::types::{Job, JobStatus};
use crate::source::{LazySource, SourceError};

/// Why a submission was refused. Nothing is recorded in any of these cases.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    InvalidUrl(#[from] DomainError),
    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("downloader unavailable: {0}")]
    Unavailable(#[source] SourceError),
    #[error(transparent)]
    Store(#[from] JobStoreError),
}

/// Acknowledgement for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmittedJob {
    pub job_id: JobId,
    pub source_url: SourceUrl,
}

/// Entry point for submitting and polling download jobs.
pub struct JobService {
    store: Arc<dyn JobStore>,
    dispatcher: Arc<dyn JobDispatcher>,
    source: Arc<LazySource>,
    output_dir: PathBuf,
    source_domain: String,
}

impl JobService {
    pub fn new(
        store: Arc<dyn JobStore>,
        dispatcher: Arc<dyn JobDispatcher>,
        source: Arc<LazySource>,
        output_dir: impl Into<PathBuf>,
        source_domain: impl Into<String>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            source,
            output_dir: output_dir.into(),
            source_domain: source_domain.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Whether the downloader can be reached, connecting it if needed.
    ///
    /// Once connected the handle is cached and this is free; while the
    /// downloader is missing every call retries the connection.
    pub async fn downloader_ready(&self) -> bool {
        self.source.get().await.is_ok()
    }

    /// Validate `url`, record a `processing` job and start it in the background.
    ///
    /// The output directory and the downloader are checked first. Returns as
    /// soon as the record exists; the job is immediately visible to
    /// [`JobService::get`].
    pub async fn submit(&self, url: &str) -> Result<SubmittedJob, SubmitError> {
        let source_url = SourceUrl::parse(url, &self.source_domain)?;

        if let Err(source) = prepare_output_dir(&self.output_dir).await {
            warn!(dir = %self.output_dir.display(), error = %source, "output directory unavailable");
            return Err(SubmitError::OutputDir {
                path: self.output_dir.clone(),
                source,
            });
        }

        if let Err(e) = self.source.get().await {
            warn!(error = %e, "downloader unavailable");
            return Err(SubmitError::Unavailable(e));
        }

        let job_id = JobId::new();
        self.store.create(job_id, source_url.as_str())?;
        info!(%job_id, url = %source_url, "job accepted");

        self.dispatcher.dispatch(job_id, source_url.clone());
        Ok(SubmittedJob { job_id, source_url })
    }

    pub fn get(&self, job_id: JobId) -> Result<Job, JobStoreError> {
        self.store.get(job_id)?.ok_or(JobStoreError::NotFound(job_id))
    }

    pub fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        self.store.list(status, limit)
    }

    pub fn stats(&self) -> JobStats {
        self.store.stats()
    }
}

impl core::fmt::Debug for JobService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JobService")
            .field("output_dir", &self.output_dir)
            .field("source_domain", &self.source_domain)
            .finish()
    }
}
