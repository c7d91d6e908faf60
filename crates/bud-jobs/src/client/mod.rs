use async_trait::async_trait;
use bud_model::{JobId, JobStatus, RuntimeEnv};

use crate::JobError;

mod ray;
pub use ray::RayJobClient;

/// Remote job service.
///
/// Abstracts the cluster the jobs run on, so the submitter can be driven by any backend (or a test double).
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Submit `entrypoint` to run inside `runtime_env`; returns the service's handle.
    async fn submit_job(&self, entrypoint: &str, runtime_env: &RuntimeEnv)
    -> Result<JobId, JobError>;

    /// Current status of a job.
    async fn job_status(&self, id: &JobId) -> Result<JobStatus, JobError>;

    /// Request a stop; returns whether the service reports the job as stopped.
    async fn stop_job(&self, id: &JobId) -> Result<bool, JobError>;

    /// Full log output of a job.
    async fn job_logs(&self, id: &JobId) -> Result<String, JobError>;
}
