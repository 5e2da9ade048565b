use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use plexsync_core::DEFAULT_SOURCE_DOMAIN;
use plexsync_infra::jobs::{
    spawn_sweeper, InMemoryJobStore, JobExecutor, JobService, JobStore, RetryPolicy, SpawnDispatcher,
};
use plexsync_infra::source::{LazySource, SourceConnector};

use crate::config::Config;

/// Knobs for wiring the job system, independent of where they came from.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub output_dir: PathBuf,
    pub source_domain: String,
    pub retry_policy: RetryPolicy,
    /// `None` disables eviction of finished jobs.
    pub job_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            output_dir: config.music_dir.clone(),
            source_domain: config.source_domain.clone(),
            retry_policy: config.retry_policy(),
            job_ttl: config.job_ttl(),
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Defaults for `output_dir`, no eviction.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            source_domain: DEFAULT_SOURCE_DOMAIN.to_string(),
            retry_policy: RetryPolicy::default(),
            job_ttl: None,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub jobs: JobService,
    sweeper: Option<JoinHandle<()>>,
}

impl Drop for AppServices {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

/// Wire store, executor, dispatcher and (optionally) the sweeper.
///
/// Must be called from within a tokio runtime. The media source is not
/// contacted here; it connects on the first health check or submission.
pub fn build_services(connector: Arc<dyn SourceConnector>, settings: ServiceSettings) -> AppServices {
    let store: Arc<dyn JobStore> = InMemoryJobStore::arc();
    let source = Arc::new(LazySource::new(connector));

    let executor = Arc::new(JobExecutor::new(
        store.clone(),
        source.clone(),
        settings.retry_policy,
        settings.output_dir.clone(),
    ));
    let dispatcher = Arc::new(SpawnDispatcher::new(executor));

    let sweeper = settings
        .job_ttl
        .map(|ttl| spawn_sweeper(store.clone(), ttl, settings.sweep_interval));

    let jobs = JobService::new(
        store,
        dispatcher,
        source,
        settings.output_dir,
        settings.source_domain,
    );

    AppServices { jobs, sweeper }
}
