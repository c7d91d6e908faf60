use serde::{Deserialize, Serialize};
use tracing::info;

use super::DaprClient;
use crate::JobError;

/// Progress message shown in a session's activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    pub session_id: String,
    /// Name of the node the message comes from.
    #[serde(rename = "from")]
    pub node_name: String,
    pub agent_id: String,
    pub msg: String,
}

impl Activity {
    pub fn new(
        session_id: impl Into<String>,
        node_name: impl Into<String>,
        agent_id: impl Into<String>,
        msg: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            node_name: node_name.into(),
            agent_id: agent_id.into(),
            msg: msg.into(),
        }
    }
}

impl DaprClient {
    /// Publish `activity` on the configured activity topic.
    pub async fn publish_activity(&self, activity: &Activity) -> Result<(), JobError> {
        let config = self.config();
        self.publish(&config.pubsub_name, &config.pubsub_topic, activity)
            .await?;

        info!(
            session = %activity.session_id,
            from = %activity.node_name,
            topic = %config.pubsub_topic,
            "activity published"
        );
        Ok(())
    }
}
