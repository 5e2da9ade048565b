//! Background download jobs with retry and backoff.
//!
//! ## Design
//!
//! - A job is accepted synchronously and executed on its own task
//! - Every job ends in exactly one terminal state: `completed` or `failed`
//! - Rate-limit failures back off linearly, other failures exponentially
//! - Finished jobs are evicted after a configurable TTL
//!
//! ## Components
//!
//! - `Job`: the record pollers see (status, logs, result or error)
//! - `JobStore`: concurrent job registry (in-memory)
//! - `RetryController`: bounded attempts around search + download
//! - `JobExecutor`: runs one job against the media source
//! - `JobDispatcher`: hands accepted jobs to background tasks
//! - `JobService`: submission and lookup API used by the HTTP layer

pub mod dispatcher;
pub mod executor;
pub mod retry;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod types;

pub use dispatcher::{JobDispatcher, SpawnDispatcher};
pub use executor::{prepare_output_dir, JobExecutor};
pub use retry::{RetryController, RetryError, RetryPolicy};
pub use service::{JobService, SubmitError, SubmittedJob};
pub use store::{InMemoryJobStore, JobStats, JobStore, JobStoreError};
pub use sweeper::{spawn_sweeper, sweep_once};
pub use types::{Job, JobOutcome, JobStatus, JobSummary, LogLine};
