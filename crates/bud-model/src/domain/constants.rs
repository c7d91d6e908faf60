/// Selects the blob storage provider (`s3`, `gcp` or `azure`).
pub const ENV_BLOB_PROVIDER: &str = "BLOB_PROVIDER";
pub const DEFAULT_BLOB_PROVIDER: &str = "s3";

/// Seconds between two uploads of the training log file.
pub const ENV_LOG_PUBLISH_INTERVAL: &str = "LOG_PUBLISH_INTERVAL";
pub const DEFAULT_LOG_PUBLISH_INTERVAL: u64 = 30;

pub const ENV_RAY_HEAD_URL: &str = "RAY_HEAD_URL";
pub const ENV_INTERNAL_ENDPOINT: &str = "INTERNAL_ENDPOINT";
pub const ENV_DAPR_HTTP_PORT: &str = "DAPR_HTTP_PORT";

pub const ENV_SESSION_ID: &str = "SESSION_ID";
pub const ENV_NODE_ID: &str = "NODE_ID";
pub const ENV_CALLBACK_ID: &str = "CALLBACK_ID";

pub const ENV_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_AWS_BUCKET_NAME: &str = "AWS_BUCKET_NAME";

pub const ENV_GOOGLE_BUCKET_NAME: &str = "GOOGLE_BUCKET_NAME";
pub const ENV_GOOGLE_APPLICATION_CREDENTIALS: &str = "GOOGLE_APPLICATION_CREDENTIALS";
pub const ENV_GOOGLE_API_TOKEN: &str = "GOOGLE_API_TOKEN";

pub const ENV_AZURE_STORAGE_CONNECTION_STRING: &str = "AZURE_STORAGE_CONNECTION_STRING";
pub const ENV_AZURE_BUCKET_NAME: &str = "AZURE_BUCKET_NAME";

/// Dapr pub/sub component and topic activities are published to.
pub const ENV_EVENT_PUBSUB_NAME: &str = "EVENT_PUBSUB_NAME";
pub const DEFAULT_EVENT_PUBSUB_NAME: &str = "bud-redis-queue";
pub const ENV_EVENT_PUBSUB_TOPIC: &str = "EVENT_PUBSUB_TOPIC";
pub const DEFAULT_EVENT_PUBSUB_TOPIC: &str = "activities";

/// Dapr state store holding node records and the service registry.
pub const ENV_BUD_STATE_STORE: &str = "BUD_STATE_STORE";
pub const DEFAULT_BUD_STATE_STORE: &str = "bud-state-store";
pub const ENV_BUD_SERVICE_REGISTRY_KEY: &str = "BUD_SERVICE_REGISTRY_KEY";
pub const DEFAULT_BUD_SERVICE_REGISTRY_KEY: &str = "service-registry";
