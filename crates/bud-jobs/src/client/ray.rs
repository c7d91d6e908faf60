use async_trait::async_trait;
use bud_model::{ENV_RAY_HEAD_URL, EnvLookup, JobId, JobStatus, RuntimeEnv};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{JobClient, JobError, http::read_json};

/// Client for the Ray Jobs REST API exposed by the cluster head (dashboard port).
#[derive(Debug, Clone)]
pub struct RayJobClient {
    http: reqwest::Client,
    address: String,
}

impl RayJobClient {
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            address,
        }
    }

    /// Address taken from `RAY_HEAD_URL`.
    pub fn from_env(env: &dyn EnvLookup) -> Result<Self, JobError> {
        Ok(Self::new(env.require(ENV_RAY_HEAD_URL)?))
    }

    /// Replace the underlying HTTP client (timeouts, proxies, headers).
    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    fn job_url(&self, id: &JobId) -> String {
        format!("{}/api/jobs/{}", self.address, id)
    }
}

#[derive(Debug, Serialize)]
struct SubmitJobRequest<'a> {
    entrypoint: &'a str,
    runtime_env: &'a RuntimeEnv,
}

#[derive(Debug, Deserialize)]
struct SubmitJobResponse {
    #[serde(default)]
    submission_id: Option<String>,
    #[serde(default)]
    job_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobDetails {
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
struct StopJobResponse {
    stopped: bool,
}

#[derive(Debug, Deserialize)]
struct JobLogsResponse {
    logs: String,
}

#[async_trait]
impl JobClient for RayJobClient {
    async fn submit_job(
        &self,
        entrypoint: &str,
        runtime_env: &RuntimeEnv,
    ) -> Result<JobId, JobError> {
        debug!(address = %self.address, entrypoint, "submitting job");

        let response = self
            .http
            .post(format!("{}/api/jobs/", self.address))
            .json(&SubmitJobRequest {
                entrypoint,
                runtime_env,
            })
            .send()
            .await?;
        let body: SubmitJobResponse = read_json(response).await?;

        let id = body
            .submission_id
            .or(body.job_id)
            .ok_or_else(|| JobError::InvalidResponse("response carries no job id".into()))?;

        info!(job = %id, "job submitted");
        Ok(JobId::from(id))
    }

    async fn job_status(&self, id: &JobId) -> Result<JobStatus, JobError> {
        let response = self.http.get(self.job_url(id)).send().await?;
        let details: JobDetails = read_json(response).await?;

        debug!(job = %id, status = %details.status, "job status");
        Ok(details.status)
    }

    async fn stop_job(&self, id: &JobId) -> Result<bool, JobError> {
        let response = self
            .http
            .post(format!("{}/stop", self.job_url(id)))
            .send()
            .await?;
        let body: StopJobResponse = read_json(response).await?;

        info!(job = %id, stopped = body.stopped, "stop requested");
        Ok(body.stopped)
    }

    async fn job_logs(&self, id: &JobId) -> Result<String, JobError> {
        let response = self
            .http
            .get(format!("{}/logs", self.job_url(id)))
            .send()
            .await?;
        let body: JobLogsResponse = read_json(response).await?;
        Ok(body.logs)
    }
}
