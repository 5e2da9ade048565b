//! Hands accepted jobs to background execution.

use std::any::Any;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use plexsync_core::{JobId, SourceUrl};

use super::executor::JobExecutor;
use super::types::JobOutcome;

/// Starts execution of an accepted job without waiting for it.
pub trait JobDispatcher: Send + Sync {
    fn dispatch(&self, job_id: JobId, url: SourceUrl);
}

/// Runs every job on its own tokio task.
///
/// A supervisor task awaits each job task; if the job panics (or its task is
/// cancelled by runtime shutdown) the job is recorded as failed instead of
/// being left in `processing`.
#[derive(Debug, Clone)]
pub struct SpawnDispatcher {
    executor: Arc<JobExecutor>,
}

impl SpawnDispatcher {
    pub fn new(executor: Arc<JobExecutor>) -> Self {
        Self { executor }
    }

    /// Spawn the job; the returned handle resolves once its record is terminal.
    pub fn spawn(&self, job_id: JobId, url: SourceUrl) -> JoinHandle<()> {
        let task = {
            let executor = self.executor.clone();
            tokio::spawn(async move { executor.execute(job_id, url.as_str()).await })
        };

        let executor = self.executor.clone();
        tokio::spawn(async move {
            match task.await {
                Ok(status) => debug!(%job_id, %status, "job task finished"),
                Err(e) => {
                    let reason = if e.is_panic() {
                        format!("job task panicked: {}", panic_message(e.into_panic()))
                    } else {
                        "job task was cancelled".to_string()
                    };
                    error!(%job_id, %reason, "job task crashed");
                    executor.finish(job_id, JobOutcome::failed(format!("internal error: {reason}")));
                }
            }
        })
    }
}

impl JobDispatcher for SpawnDispatcher {
    fn dispatch(&self, job_id: JobId, url: SourceUrl) {
        let _ = self.spawn(job_id, url);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
