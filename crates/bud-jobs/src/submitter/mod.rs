use std::{path::PathBuf, sync::Arc};

use bud_model::{
    BlobProvider, DEFAULT_LOG_PUBLISH_INTERVAL, ENV_BLOB_PROVIDER, ENV_CALLBACK_ID,
    ENV_INTERNAL_ENDPOINT, ENV_LOG_PUBLISH_INTERVAL, ENV_NODE_ID, ENV_SESSION_ID, EnvLookup,
    EnvVars, JobArgs, JobId, JobStatus, PipSpec, ProcessEnv, RuntimeEnv, RuntimeEnvOverrides,
};
use tracing::{debug, info, instrument, warn};

use crate::{JobClient, JobError, RayJobClient};

mod requirements;
pub use requirements::{filter_requirements, package_name, read_requirements};

/// Variables identifying the job to the workflow services; always set by the submitter.
const IDENTIFIERS: [&str; 4] = [
    ENV_SESSION_ID,
    ENV_NODE_ID,
    ENV_CALLBACK_ID,
    ENV_INTERNAL_ENDPOINT,
];

/// Static part of every submission.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Local directory shipped to the cluster.
    pub working_dir: String,
    /// Files never shipped with the working directory.
    pub excludes: Vec<String>,
    /// Pin applied to the remote pip installation.
    pub pip_version: String,
    /// Packages removed from the requirements file. The cluster provides its own job client,
    /// reinstalling it remotely would break the runtime.
    pub excluded_packages: Vec<String>,
    /// Command the job arguments are appended to when no explicit entrypoint is given.
    pub command: String,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            working_dir: "./".to_string(),
            excludes: [
                ".env",
                ".env.example",
                "poetry.lock",
                "run.sh",
                "node.py",
                "models.py",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            pip_version: "==23.3.1;python_version=='3.9'".to_string(),
            excluded_packages: vec!["ray".to_string()],
            command: "python train.py".to_string(),
        }
    }
}

/// One job submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub data: JobArgs,
    pub session_id: String,
    pub node_id: String,
    pub callback_id: String,
    pub requirements_file: PathBuf,
    /// Shell command run as-is instead of the configured command plus arguments.
    pub entrypoint: Option<String>,
    pub runtime_env: Option<RuntimeEnvOverrides>,
}

impl SubmitRequest {
    pub fn new(
        data: JobArgs,
        session_id: impl Into<String>,
        node_id: impl Into<String>,
        callback_id: impl Into<String>,
    ) -> Self {
        Self {
            data,
            session_id: session_id.into(),
            node_id: node_id.into(),
            callback_id: callback_id.into(),
            requirements_file: PathBuf::from("requirements.txt"),
            entrypoint: None,
            runtime_env: None,
        }
    }

    pub fn with_requirements_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.requirements_file = path.into();
        self
    }

    pub fn with_entrypoint(mut self, entrypoint: impl Into<String>) -> Self {
        self.entrypoint = Some(entrypoint.into());
        self
    }

    pub fn with_runtime_env(mut self, overrides: RuntimeEnvOverrides) -> Self {
        self.runtime_env = Some(overrides);
        self
    }
}

/// Submits training jobs and stops them.
///
/// Configuration variables are read on every submission, so a fresh descriptor always reflects
/// the current environment.
pub struct JobSubmitter<C> {
    client: C,
    env: Arc<dyn EnvLookup>,
    config: SubmitterConfig,
}

impl JobSubmitter<RayJobClient> {
    /// Ray client addressed by `RAY_HEAD_URL`, reading the process environment.
    pub fn from_env() -> Result<Self, JobError> {
        Ok(Self::new(RayJobClient::from_env(&ProcessEnv)?))
    }
}

impl<C> JobSubmitter<C>
where
    C: JobClient,
{
    pub fn new(client: C) -> Self {
        Self {
            client,
            env: Arc::new(ProcessEnv),
            config: SubmitterConfig::default(),
        }
    }

    pub fn with_env(mut self, env: impl EnvLookup + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    pub fn with_config(mut self, config: SubmitterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &SubmitterConfig {
        &self.config
    }

    /// Command line the job runs.
    pub fn entrypoint(&self, req: &SubmitRequest) -> String {
        match req.entrypoint.as_deref() {
            Some(entrypoint) if !entrypoint.is_empty() => entrypoint.to_string(),
            _ => format!("{} {}", self.config.command, req.data.to_args().join(" ")),
        }
    }

    /// Build the execution environment for `req`.
    ///
    /// Caller overrides are applied on top of the computed defaults; the session, node,
    /// callback and internal endpoint variables are set last and cannot be overridden.
    pub async fn runtime_env(&self, req: &SubmitRequest) -> Result<RuntimeEnv, JobError> {
        let packages =
            read_requirements(&req.requirements_file, &self.config.excluded_packages).await?;

        let provider = BlobProvider::from_env(self.env.as_ref())?;
        let interval = self
            .env
            .get(ENV_LOG_PUBLISH_INTERVAL)
            .unwrap_or_else(|| DEFAULT_LOG_PUBLISH_INTERVAL.to_string());

        let mut env_vars = EnvVars::new()
            .with(ENV_BLOB_PROVIDER, provider.name())
            .with(ENV_LOG_PUBLISH_INTERVAL, interval);
        env_vars.extend(provider.env_vars().iter());

        let mut runtime_env = RuntimeEnv {
            working_dir: self.config.working_dir.clone(),
            excludes: self.config.excludes.clone(),
            pip: PipSpec {
                packages,
                pip_version: self.config.pip_version.clone(),
            },
            env_vars,
            extra: Default::default(),
        };
        if let Some(overrides) = req.runtime_env.clone() {
            for key in IDENTIFIERS {
                if overrides.env_vars.contains_key(key) {
                    warn!(key, "override of a job identifier ignored");
                }
            }
            runtime_env = runtime_env.apply(overrides)?;
        }

        let endpoint = self.env.require(ENV_INTERNAL_ENDPOINT)?;
        runtime_env.env_vars.set(ENV_SESSION_ID, req.session_id.as_str());
        runtime_env.env_vars.set(ENV_NODE_ID, req.node_id.as_str());
        runtime_env.env_vars.set(ENV_CALLBACK_ID, req.callback_id.as_str());
        runtime_env.env_vars.set(ENV_INTERNAL_ENDPOINT, endpoint);

        debug!(
            provider = provider.name(),
            packages = runtime_env.pip.packages.len(),
            env_vars = runtime_env.env_vars.len(),
            "runtime environment built"
        );
        Ok(runtime_env)
    }

    /// Submit a job; the client's handle is returned unchanged.
    #[instrument(level = "debug", skip(self, req), fields(session = %req.session_id, node = %req.node_id))]
    pub async fn submit(&self, req: SubmitRequest) -> Result<JobId, JobError> {
        let runtime_env = self.runtime_env(&req).await?;
        let entrypoint = self.entrypoint(&req);

        let id = self.client.submit_job(&entrypoint, &runtime_env).await?;
        info!(job = %id, "training job submitted");
        Ok(id)
    }

    /// Stop a job if it is pending or running.
    ///
    /// A job that already reached a terminal state counts as stopped.
    #[instrument(level = "debug", skip(self))]
    pub async fn stop(&self, id: &JobId) -> Result<bool, JobError> {
        // TODO: distinguish an unknown job id from other request failures once the client reports it.
        let status = self.client.job_status(id).await?;
        if status.is_terminal() {
            debug!(job = %id, %status, "job already finished, nothing to stop");
            return Ok(true);
        }
        self.client.stop_job(id).await
    }

    pub async fn status(&self, id: &JobId) -> Result<JobStatus, JobError> {
        self.client.job_status(id).await
    }

    pub async fn logs(&self, id: &JobId) -> Result<String, JobError> {
        self.client.job_logs(id).await
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        path::Path,
        sync::Mutex,
    };

    use async_trait::async_trait;
    use bud_model::ModelError;

    use super::*;

    #[derive(Default)]
    struct FakeClient {
        status: Option<JobStatus>,
        stop_result: bool,
        submitted: Mutex<Vec<(String, RuntimeEnv)>>,
        stops: Mutex<Vec<JobId>>,
    }

    impl FakeClient {
        fn with_status(status: JobStatus, stop_result: bool) -> Self {
            Self {
                status: Some(status),
                stop_result,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl JobClient for FakeClient {
        async fn submit_job(
            &self,
            entrypoint: &str,
            runtime_env: &RuntimeEnv,
        ) -> Result<JobId, JobError> {
            self.submitted
                .lock()
                .unwrap()
                .push((entrypoint.to_string(), runtime_env.clone()));
            Ok(JobId::from("raysubmit_42"))
        }

        async fn job_status(&self, _id: &JobId) -> Result<JobStatus, JobError> {
            self.status.ok_or_else(|| JobError::Http {
                status: 404,
                body: "job not found".into(),
            })
        }

        async fn stop_job(&self, id: &JobId) -> Result<bool, JobError> {
            self.stops.lock().unwrap().push(id.clone());
            Ok(self.stop_result)
        }

        async fn job_logs(&self, _id: &JobId) -> Result<String, JobError> {
            Ok(String::new())
        }
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        let mut vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        vars.entry("INTERNAL_ENDPOINT".into())
            .or_insert_with(|| "http://internal:9000".into());
        vars
    }

    fn s3_env() -> HashMap<String, String> {
        env(&[
            ("AWS_ACCESS_KEY_ID", "id"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_BUCKET_NAME", "bucket"),
        ])
    }

    fn requirements(dir: &Path) -> PathBuf {
        let path = dir.join("requirements.txt");
        std::fs::write(&path, "torch==2.1.0\nray==2.3.0\naccelerate\n").unwrap();
        path
    }

    fn request(dir: &Path, data: JobArgs) -> SubmitRequest {
        SubmitRequest::new(data, "sess-1", "node-1", "cb-1").with_requirements_file(requirements(dir))
    }

    fn sorted_keys(vars: &EnvVars) -> Vec<&str> {
        let mut keys: Vec<_> = vars.keys().collect();
        keys.sort();
        keys
    }

    const IDS: [&str; 4] = ["CALLBACK_ID", "INTERNAL_ENDPOINT", "NODE_ID", "SESSION_ID"];
    const SETTINGS: [&str; 2] = ["BLOB_PROVIDER", "LOG_PUBLISH_INTERVAL"];

    fn expected_keys(provider_keys: &[&'static str]) -> Vec<&'static str> {
        let mut keys: Vec<&str> = IDS
            .iter()
            .chain(SETTINGS.iter())
            .chain(provider_keys.iter())
            .copied()
            .collect();
        keys.sort();
        keys
    }

    #[tokio::test]
    async fn submit_builds_entrypoint_from_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let submitter = JobSubmitter::new(FakeClient::default()).with_env(s3_env());

        let data = JobArgs::mapping([
            ("model", Some("llama")),
            ("resume", None),
            ("epochs", Some("3")),
        ]);
        let id = submitter.submit(request(dir.path(), data)).await.unwrap();
        assert_eq!(id.as_str(), "raysubmit_42");

        let submitted = submitter.client().submitted.lock().unwrap();
        let (entrypoint, runtime_env) = &submitted[0];
        assert_eq!(entrypoint, "python train.py --model llama --epochs 3");
        assert_eq!(runtime_env.working_dir, "./");
        assert_eq!(runtime_env.excludes.len(), 6);
        assert_eq!(runtime_env.pip.packages, vec!["torch==2.1.0", "accelerate"]);
        assert_eq!(runtime_env.pip.pip_version, "==23.3.1;python_version=='3.9'");
    }

    #[tokio::test]
    async fn sequence_args_and_explicit_entrypoint() {
        let dir = tempfile::tempdir().unwrap();
        let submitter = JobSubmitter::new(FakeClient::default()).with_env(s3_env());

        let req = request(dir.path(), JobArgs::sequence(["--config", "cfg.yaml"]));
        assert_eq!(
            submitter.entrypoint(&req),
            "python train.py --config cfg.yaml"
        );

        let req = req.with_entrypoint("bash run_eval.sh");
        assert_eq!(submitter.entrypoint(&req), "bash run_eval.sh");

        submitter.submit(req).await.unwrap();
        let submitted = submitter.client().submitted.lock().unwrap();
        assert_eq!(submitted[0].0, "bash run_eval.sh");
    }

    #[tokio::test]
    async fn env_vars_follow_each_provider() {
        let dir = tempfile::tempdir().unwrap();
        let cases: Vec<(HashMap<String, String>, Vec<&'static str>)> = vec![
            (
                s3_env(),
                vec!["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_BUCKET_NAME"],
            ),
            (
                env(&[("BLOB_PROVIDER", "gcp"), ("GOOGLE_BUCKET_NAME", "b")]),
                vec!["GOOGLE_BUCKET_NAME"],
            ),
            (
                env(&[
                    ("BLOB_PROVIDER", "gcp"),
                    ("GOOGLE_BUCKET_NAME", "b"),
                    ("GOOGLE_API_TOKEN", "t"),
                ]),
                vec!["GOOGLE_BUCKET_NAME", "GOOGLE_API_TOKEN"],
            ),
            (
                env(&[
                    ("BLOB_PROVIDER", "azure"),
                    ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=k"),
                    ("AZURE_BUCKET_NAME", "c"),
                ]),
                vec!["AZURE_STORAGE_CONNECTION_STRING", "AZURE_BUCKET_NAME"],
            ),
        ];

        for (vars, provider_keys) in cases {
            let submitter = JobSubmitter::new(FakeClient::default()).with_env(vars);
            let runtime_env = submitter
                .runtime_env(&request(dir.path(), JobArgs::default()))
                .await
                .unwrap();

            assert_eq!(
                sorted_keys(&runtime_env.env_vars),
                expected_keys(&provider_keys)
            );
            assert_eq!(runtime_env.env_vars.get("SESSION_ID"), Some("sess-1"));
            assert_eq!(runtime_env.env_vars.get("NODE_ID"), Some("node-1"));
            assert_eq!(runtime_env.env_vars.get("CALLBACK_ID"), Some("cb-1"));
            assert_eq!(
                runtime_env.env_vars.get("INTERNAL_ENDPOINT"),
                Some("http://internal:9000")
            );
            assert_eq!(runtime_env.env_vars.get("LOG_PUBLISH_INTERVAL"), Some("30"));
        }
    }

    #[tokio::test]
    async fn overrides_win_except_for_identifiers() {
        let dir = tempfile::tempdir().unwrap();
        let submitter = JobSubmitter::new(FakeClient::default()).with_env(s3_env());

        let overrides = RuntimeEnvOverrides::new()
            .with_working_dir("/srv/train")
            .with_env("AWS_BUCKET_NAME", "other-bucket")
            .with_env("WANDB_MODE", "offline")
            .with_env("SESSION_ID", "hijack")
            .with_env("INTERNAL_ENDPOINT", "http://evil");
        let req = request(dir.path(), JobArgs::default()).with_runtime_env(overrides);

        let runtime_env = submitter.runtime_env(&req).await.unwrap();
        assert_eq!(runtime_env.working_dir, "/srv/train");
        assert_eq!(runtime_env.env_vars.get("AWS_BUCKET_NAME"), Some("other-bucket"));
        assert_eq!(runtime_env.env_vars.get("WANDB_MODE"), Some("offline"));
        assert_eq!(runtime_env.env_vars.get("SESSION_ID"), Some("sess-1"));
        assert_eq!(
            runtime_env.env_vars.get("INTERNAL_ENDPOINT"),
            Some("http://internal:9000")
        );
    }

    #[tokio::test]
    async fn extra_runtime_env_keys_reach_the_client() {
        let dir = tempfile::tempdir().unwrap();
        let submitter = JobSubmitter::new(FakeClient::default()).with_env(s3_env());

        let overrides = RuntimeEnvOverrides::new().with_field("py_modules", vec!["modules"]);
        let req = request(dir.path(), JobArgs::default()).with_runtime_env(overrides);
        submitter.submit(req).await.unwrap();

        let submitted = submitter.client().submitted.lock().unwrap();
        let runtime_env = &submitted[0].1;
        assert_eq!(runtime_env.extra["py_modules"][0], "modules");
    }

    #[tokio::test]
    async fn extra_key_shadowing_a_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let submitter = JobSubmitter::new(FakeClient::default()).with_env(s3_env());

        let overrides = RuntimeEnvOverrides::new().with_field("pip", "torch");
        let req = request(dir.path(), JobArgs::default()).with_runtime_env(overrides);
        let err = submitter.submit(req).await.unwrap_err();

        assert!(matches!(err, JobError::Model(ModelError::InvalidArgument(_))));
        assert!(submitter.client().submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_credentials_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let submitter = JobSubmitter::new(FakeClient::default())
            .with_env(env(&[("AWS_ACCESS_KEY_ID", "id")]));

        let err = submitter
            .submit(request(dir.path(), JobArgs::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::Model(ModelError::MissingEnv(ref k)) if k == "AWS_SECRET_ACCESS_KEY"
        ));
        assert!(submitter.client().submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_internal_endpoint_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut vars = s3_env();
        vars.remove("INTERNAL_ENDPOINT");
        let submitter = JobSubmitter::new(FakeClient::default()).with_env(vars);

        let err = submitter
            .submit(request(dir.path(), JobArgs::default()))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            JobError::Model(ModelError::MissingEnv(ref k)) if k == "INTERNAL_ENDPOINT"
        ));
    }

    #[tokio::test]
    async fn stop_running_job_calls_stop() {
        let submitter = JobSubmitter::new(FakeClient::with_status(JobStatus::Running, false));
        let id = JobId::from("raysubmit_1");

        assert!(!submitter.stop(&id).await.unwrap());
        assert_eq!(*submitter.client().stops.lock().unwrap(), vec![id]);
    }

    #[tokio::test]
    async fn stop_pending_job_calls_stop() {
        let submitter = JobSubmitter::new(FakeClient::with_status(JobStatus::Pending, true));
        assert!(submitter.stop(&JobId::from("j")).await.unwrap());
        assert_eq!(submitter.client().stops.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stop_finished_job_is_a_no_op() {
        for status in [JobStatus::Succeeded, JobStatus::Failed, JobStatus::Stopped] {
            let submitter = JobSubmitter::new(FakeClient::with_status(status, false));
            assert!(submitter.stop(&JobId::from("j")).await.unwrap());
            assert!(submitter.client().stops.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn stop_propagates_status_errors() {
        let submitter = JobSubmitter::new(FakeClient::default());
        let err = submitter.stop(&JobId::from("unknown")).await.unwrap_err();
        assert!(matches!(err, JobError::Http { status: 404, .. }));
    }
}
