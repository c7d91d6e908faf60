use bud_model::{
    DEFAULT_BUD_SERVICE_REGISTRY_KEY, DEFAULT_BUD_STATE_STORE, DEFAULT_EVENT_PUBSUB_NAME,
    DEFAULT_EVENT_PUBSUB_TOPIC, ENV_BUD_SERVICE_REGISTRY_KEY, ENV_BUD_STATE_STORE,
    ENV_DAPR_HTTP_PORT, ENV_EVENT_PUBSUB_NAME, ENV_EVENT_PUBSUB_TOPIC, EnvLookup,
};
use reqwest::{StatusCode, header::ETAG};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::{
    JobError,
    http::{expect_success, read_json},
};

mod activity;
pub use activity::Activity;

mod registry;
pub use registry::NodeInfo;

/// Base URL of the Dapr sidecar listening on `port` of the local host.
pub(crate) fn sidecar_url(port: &str) -> String {
    format!("http://localhost:{port}")
}

/// Names of the Dapr components the workflow services share.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaprConfig {
    pub pubsub_name: String,
    pub pubsub_topic: String,
    pub state_store: String,
    /// State key holding the list of registered job topics.
    pub registry_key: String,
}

impl Default for DaprConfig {
    fn default() -> Self {
        Self {
            pubsub_name: DEFAULT_EVENT_PUBSUB_NAME.to_string(),
            pubsub_topic: DEFAULT_EVENT_PUBSUB_TOPIC.to_string(),
            state_store: DEFAULT_BUD_STATE_STORE.to_string(),
            registry_key: DEFAULT_BUD_SERVICE_REGISTRY_KEY.to_string(),
        }
    }
}

impl DaprConfig {
    /// Component names from the environment; unset variables keep their defaults.
    pub fn from_env(env: &dyn EnvLookup) -> Self {
        let defaults = Self::default();
        Self {
            pubsub_name: env.get(ENV_EVENT_PUBSUB_NAME).unwrap_or(defaults.pubsub_name),
            pubsub_topic: env.get(ENV_EVENT_PUBSUB_TOPIC).unwrap_or(defaults.pubsub_topic),
            state_store: env.get(ENV_BUD_STATE_STORE).unwrap_or(defaults.state_store),
            registry_key: env
                .get(ENV_BUD_SERVICE_REGISTRY_KEY)
                .unwrap_or(defaults.registry_key),
        }
    }
}

/// Value and version of one state entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry<T> {
    /// `None` when the key does not exist.
    pub value: Option<T>,
    pub etag: Option<String>,
}

/// One write of [`DaprClient::save_state`].
#[derive(Debug, Serialize)]
pub struct StateItem<'a, T: Serialize> {
    key: &'a str,
    value: &'a T,
    #[serde(skip_serializing_if = "Option::is_none")]
    etag: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<StateOptions>,
    metadata: StateMetadata,
}

#[derive(Debug, Serialize)]
struct StateOptions {
    concurrency: &'static str,
    consistency: &'static str,
}

#[derive(Debug, Serialize)]
struct StateMetadata {
    #[serde(rename = "contentType")]
    content_type: &'static str,
}

impl<'a, T: Serialize> StateItem<'a, T> {
    pub fn new(key: &'a str, value: &'a T) -> Self {
        Self {
            key,
            value,
            etag: None,
            options: None,
            metadata: StateMetadata {
                content_type: "application/json",
            },
        }
    }

    /// Write only if the stored entry still carries `etag`.
    ///
    /// A stale etag makes the sidecar answer `409 Conflict`.
    pub fn first_write(mut self, etag: Option<&'a str>) -> Self {
        self.etag = etag;
        self.options = Some(StateOptions {
            concurrency: "first-write",
            consistency: "strong",
        });
        self
    }
}

/// Client for the HTTP API of the local Dapr sidecar.
#[derive(Debug, Clone)]
pub struct DaprClient {
    http: reqwest::Client,
    base_url: String,
    config: DaprConfig,
}

impl DaprClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            config: DaprConfig::default(),
        }
    }

    /// Sidecar on `DAPR_HTTP_PORT`, component names from the environment.
    pub fn from_env(env: &dyn EnvLookup) -> Result<Self, JobError> {
        let port = env.require(ENV_DAPR_HTTP_PORT)?;
        Ok(Self::new(sidecar_url(&port)).with_config(DaprConfig::from_env(env)))
    }

    pub fn with_config(mut self, config: DaprConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn config(&self) -> &DaprConfig {
        &self.config
    }

    /// Publish `data` as a JSON event on `topic` of the `pubsub` component.
    pub async fn publish<T>(&self, pubsub: &str, topic: &str, data: &T) -> Result<(), JobError>
    where
        T: Serialize + ?Sized,
    {
        let url = format!("{}/v1.0/publish/{pubsub}/{topic}", self.base_url);
        debug!(url = %url, "publishing event");

        let response = self.http.post(url).json(data).send().await?;
        expect_success(response).await
    }

    /// Read `key` from `store` together with its etag.
    pub async fn get_state<T>(&self, store: &str, key: &str) -> Result<StateEntry<T>, JobError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/v1.0/state/{store}/{key}", self.base_url);
        let response = self.http.get(url).send().await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(StateEntry {
                value: None,
                etag: None,
            });
        }
        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let value = read_json(response).await?;

        Ok(StateEntry {
            value: Some(value),
            etag,
        })
    }

    /// Write `items` to `store` in one request.
    pub async fn save_state<T>(&self, store: &str, items: &[StateItem<'_, T>]) -> Result<(), JobError>
    where
        T: Serialize,
    {
        let url = format!("{}/v1.0/state/{store}", self.base_url);
        let response = self.http.post(url).json(items).send().await?;
        expect_success(response).await
    }
}
