use std::{sync::Arc, time::Duration};

use tracing::{Level, info};

use bud_jobs::prelude::*;
use bud_jobs::{Activity, DaprClient};
use bud_model::{ENV_DAPR_HTTP_PORT, EnvLookup, ProcessEnv};
use bud_observe::{LocalGroup, LogOptions, LoggerConfig, MultiProcessLogger, logger_init};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1) Logger, with a file the adapter can publish
    let cfg = LoggerConfig::default().with_file("submit-job.log");
    logger_init(&cfg)?;
    info!("logger initialized");

    // 2) Job arguments: a JSON object or array as the first CLI argument
    let raw = std::env::args()
        .nth(1)
        .unwrap_or_else(|| r#"{"epochs": 1, "lr": 0.00002}"#.to_string());
    let data = JobArgs::try_from(serde_json::from_str::<serde_json::Value>(&raw)?)?;

    // 3) Submit to the cluster at RAY_HEAD_URL
    let submitter = JobSubmitter::from_env()?;
    let req = SubmitRequest::new(data, "demo-session", "demo-node", "demo-callback")
        .with_runtime_env(RuntimeEnvOverrides::new().with_env("WANDB_MODE", "offline"));
    info!(entrypoint = %submitter.entrypoint(&req), "submitting");
    let id = submitter.submit(req).await?;

    // 4) Tell the session feed, when a sidecar is around
    if ProcessEnv.get(ENV_DAPR_HTTP_PORT).is_some() {
        DaprClient::from_env(&ProcessEnv)?
            .publish_activity(&Activity::new(
                "demo-session",
                "demo-node",
                "submit-job",
                format!("job {id} submitted"),
            ))
            .await?;
    }

    // 5) Wait for the job to finish
    let status = loop {
        let status = submitter.status(&id).await?;
        info!(job = %id, %status, "polled");
        if status.is_terminal() {
            break status;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    };
    println!("{}", submitter.logs(&id).await?);

    // 6) Publish the local log to blob storage
    let logger = MultiProcessLogger::from_env(&cfg, Arc::new(LocalGroup::single()), &ProcessEnv)?
        .with_blob_key(format!("demo-session/{id}/submit-job.log"));
    logger
        .log(
            Level::INFO,
            &format!("job {id} finished with {status}"),
            LogOptions::default().end(),
        )
        .await?;

    Ok(())
}
