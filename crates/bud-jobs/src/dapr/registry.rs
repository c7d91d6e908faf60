use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{DaprClient, StateItem};
use crate::JobError;

/// Record of a workflow node kept in the state store under its job topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    /// Topic the node receives jobs on; also its key in the state store.
    pub job_topic: String,
    /// Additional attributes stored with the record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeInfo {
    pub fn new(
        name: impl Into<String>,
        node_type: impl Into<String>,
        job_topic: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            node_type: node_type.into(),
            job_topic: job_topic.into(),
            extra: Map::new(),
        }
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Registry value: a JSON list of topics, or that list encoded as a string by older writers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Registry {
    Topics(Vec<String>),
    Encoded(String),
}

impl Registry {
    fn into_topics(self) -> Result<Vec<String>, JobError> {
        match self {
            Registry::Topics(topics) => Ok(topics),
            Registry::Encoded(raw) => serde_json::from_str(&raw).map_err(|e| {
                JobError::InvalidResponse(format!("malformed service registry: {e}, value: {raw}"))
            }),
        }
    }
}

/// Answer of the sidecar to a write whose etag is stale.
const CONFLICT: u16 = 409;

impl DaprClient {
    /// Store `node` and add its job topic to the service registry.
    pub async fn register_node(&self, node: &NodeInfo) -> Result<(), JobError> {
        self.store_node(node).await?;
        self.update_service_registry(&node.job_topic).await
    }

    /// Save `node` under its job topic.
    pub async fn store_node(&self, node: &NodeInfo) -> Result<(), JobError> {
        let store = &self.config().state_store;
        self.save_state(store, &[StateItem::new(&node.job_topic, node)])
            .await?;

        info!(node = %node.name, topic = %node.job_topic, "node stored");
        Ok(())
    }

    /// Add `job_topic` to the service registry.
    ///
    /// The registry is shared by every node, so the write is conditional on the etag read
    /// just before; a write lost to a concurrent writer is redone on the fresh value.
    pub async fn update_service_registry(&self, job_topic: &str) -> Result<(), JobError> {
        let store = &self.config().state_store;
        let key = &self.config().registry_key;

        loop {
            let entry = self.get_state::<Registry>(store, key).await?;
            let mut topics = match entry.value {
                Some(registry) => registry.into_topics()?,
                None => Vec::new(),
            };
            debug!(topics = ?topics, "current service registry");

            if !topics.iter().any(|t| t == job_topic) {
                topics.push(job_topic.to_string());
            }

            let item = StateItem::new(key, &topics).first_write(entry.etag.as_deref());
            match self.save_state(store, &[item]).await {
                Ok(()) => {
                    info!(topic = job_topic, "service registry updated");
                    return Ok(());
                }
                Err(JobError::Http { status, .. }) if status == CONFLICT => {
                    debug!(topic = job_topic, "service registry changed concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}
