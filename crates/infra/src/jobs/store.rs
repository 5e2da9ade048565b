//! Job record storage.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use plexsync_core::JobId;

use super::types::{Job, JobOutcome, JobStatus};

/// Job store abstraction.
///
/// Implementations must tolerate concurrent writers (one executor per job)
/// and concurrent readers polling arbitrary jobs. Within one job, log lines
/// are kept in append order.
pub trait JobStore: Send + Sync {
    /// Register a new job in `Processing`.
    fn create(&self, id: JobId, source_url: &str) -> Result<Job, JobStoreError>;

    /// Append a log line. Unknown ids are ignored; this never fails.
    fn append_log(&self, id: JobId, message: &str);

    /// Record the terminal outcome. Rejected if the job already finished.
    fn set_terminal(&self, id: JobId, outcome: JobOutcome) -> Result<Job, JobStoreError>;

    /// Get a job by ID.
    fn get(&self, id: JobId) -> Result<Option<Job>, JobStoreError>;

    /// List jobs, oldest first, optionally filtered by status.
    fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, JobStoreError>;

    /// Remove finished jobs last updated before `cutoff`. Returns how many.
    fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize;

    /// Get job statistics.
    fn stats(&self) -> JobStats;
}

/// Job store error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobStoreError {
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("job already exists: {0}")]
    AlreadyExists(JobId),
    #[error("job {id} already finished as {status}")]
    AlreadyTerminal { id: JobId, status: JobStatus },
}

/// Job counts per status.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct JobStats {
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

/// In-memory job store.
///
/// A single lock guards every record; writes are short and contention is low.
#[derive(Debug)]
pub struct InMemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    // A poisoned lock only means another writer panicked mid-update; every
    // update here is a single insert or push, so the map is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, Job>> {
        self.jobs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, Job>> {
        self.jobs.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for InMemoryJobStore {
    fn create(&self, id: JobId, source_url: &str) -> Result<Job, JobStoreError> {
        let mut jobs = self.write();
        if jobs.contains_key(&id) {
            return Err(JobStoreError::AlreadyExists(id));
        }
        let job = Job::new(id, source_url);
        jobs.insert(id, job.clone());
        Ok(job)
    }

    fn append_log(&self, id: JobId, message: &str) {
        if let Some(job) = self.write().get_mut(&id) {
            job.push_log(message);
        }
    }

    fn set_terminal(&self, id: JobId, outcome: JobOutcome) -> Result<Job, JobStoreError> {
        let mut jobs = self.write();
        let job = jobs.get_mut(&id).ok_or(JobStoreError::NotFound(id))?;
        if !job.finish(outcome) {
            return Err(JobStoreError::AlreadyTerminal {
                id,
                status: job.status,
            });
        }
        Ok(job.clone())
    }

    fn get(&self, id: JobId) -> Result<Option<Job>, JobStoreError> {
        Ok(self.read().get(&id).cloned())
    }

    fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        let jobs = self.read();
        let mut result: Vec<_> = jobs
            .values()
            .filter(|j| status.map_or(true, |s| j.status == s))
            .cloned()
            .collect();

        result.sort_by_key(|j| (j.created_at, j.id));
        result.truncate(limit);
        Ok(result)
    }

    fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.write();
        let before = jobs.len();
        jobs.retain(|_, j| !(j.status.is_terminal() && j.updated_at < cutoff));
        before - jobs.len()
    }

    fn stats(&self) -> JobStats {
        let jobs = self.read();
        let mut stats = JobStats::default();
        for job in jobs.values() {
            match job.status {
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

impl JobStore for Arc<InMemoryJobStore> {
    fn create(&self, id: JobId, source_url: &str) -> Result<Job, JobStoreError> {
        (**self).create(id, source_url)
    }

    fn append_log(&self, id: JobId, message: &str) {
        (**self).append_log(id, message)
    }

    fn set_terminal(&self, id: JobId, outcome: JobOutcome) -> Result<Job, JobStoreError> {
        (**self).set_terminal(id, outcome)
    }

    fn get(&self, id: JobId) -> Result<Option<Job>, JobStoreError> {
        (**self).get(id)
    }

    fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>, JobStoreError> {
        (**self).list(status, limit)
    }

    fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> usize {
        (**self).evict_finished_before(cutoff)
    }

    fn stats(&self) -> JobStats {
        (**self).stats()
    }
}
