use bud_model::{ENV_DAPR_HTTP_PORT, ENV_INTERNAL_ENDPOINT, EnvLookup, ModelError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{JobError, dapr::sidecar_url, http::read_json};

/// Reports job progress back to the workflow services.
#[derive(Debug, Clone)]
pub struct CallbackClient {
    http: reqwest::Client,
    internal_endpoint: String,
    dapr_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct CallbackReport<'a> {
    data: &'a Value,
    cid: &'a str,
}

#[derive(Debug, Serialize)]
struct CallbackRegistration<'a> {
    session_id: &'a str,
    node_id: &'a str,
    node_type: &'a str,
    // Key spelled as the workflow manager reads it.
    #[serde(rename = "cuase")]
    cause: &'a str,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    id: String,
}

impl CallbackClient {
    pub fn new(internal_endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            internal_endpoint: internal_endpoint.into().trim_end_matches('/').to_string(),
            dapr_url: None,
        }
    }

    /// `INTERNAL_ENDPOINT` is required; registration additionally needs `DAPR_HTTP_PORT`.
    pub fn from_env(env: &dyn EnvLookup) -> Result<Self, JobError> {
        let mut client = Self::new(env.require(ENV_INTERNAL_ENDPOINT)?);
        if let Some(port) = env.get(ENV_DAPR_HTTP_PORT) {
            client = client.with_dapr_url(sidecar_url(&port));
        }
        Ok(client)
    }

    /// Base URL of the local Dapr sidecar.
    pub fn with_dapr_url(mut self, url: impl Into<String>) -> Self {
        self.dapr_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Post a result for callback `cid` to the internal endpoint; returns the service's answer.
    pub async fn report(&self, data: &Value, cid: &str) -> Result<Value, JobError> {
        let url = format!("{}/internal/v1/callback", self.internal_endpoint);
        debug!(url = %url, cid, "reporting to callback");

        let response = self
            .http
            .post(url)
            .json(&CallbackReport { data, cid })
            .send()
            .await?;
        read_json(response).await
    }

    /// Register a workflow callback through the Dapr sidecar; returns the callback id.
    pub async fn register(
        &self,
        session_id: &str,
        node_id: &str,
        node_type: &str,
        cause: &str,
    ) -> Result<String, JobError> {
        let base = self
            .dapr_url
            .as_deref()
            .ok_or_else(|| ModelError::MissingEnv(ENV_DAPR_HTTP_PORT.to_string()))?;
        let url =
            format!("{base}/v1.0/invoke/workflow-manager/method/publish-workflow-callback");

        let response = self
            .http
            .post(url)
            .json(&CallbackRegistration {
                session_id,
                node_id,
                node_type,
                cause,
            })
            .send()
            .await?;
        let body: RegistrationResponse = read_json(response).await?;

        debug!(session = session_id, node = node_id, callback = %body.id, "callback registered");
        Ok(body.id)
    }
}
