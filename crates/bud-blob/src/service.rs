use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use bud_model::{BlobProvider, ENV_GOOGLE_API_TOKEN, EnvLookup, ModelError};
use object_store::{
    ObjectStore, PutPayload, StaticCredentialProvider,
    aws::AmazonS3Builder,
    azure::MicrosoftAzureBuilder,
    gcp::{GcpCredential, GoogleCloudStorageBuilder},
    path::Path as ObjectPath,
};
use tracing::{debug, info};

use crate::{BlobError, BlobUpload};

/// Uploads files to the bucket of the configured [`BlobProvider`].
///
/// The underlying store client is built once and reused for every upload.
pub struct BlobService {
    provider: BlobProvider,
    store: Arc<dyn ObjectStore>,
}

impl BlobService {
    /// Build a service with a store client for `provider`.
    pub fn new(provider: BlobProvider) -> Result<Self, BlobError> {
        let store = build_store(&provider)?;
        debug!(provider = provider.name(), bucket = provider.bucket(), "blob store ready");
        Ok(Self { provider, store })
    }

    /// Build a service for the provider selected by the environment.
    pub fn from_env(env: &dyn EnvLookup) -> Result<Self, BlobError> {
        Self::new(BlobProvider::from_env(env)?)
    }

    /// Use an already constructed store, e.g. an in-memory one.
    pub fn with_store(provider: BlobProvider, store: Arc<dyn ObjectStore>) -> Self {
        Self { provider, store }
    }

    pub fn provider(&self) -> &BlobProvider {
        &self.provider
    }

    /// Full URL a key is published under.
    pub fn url(&self, key: &str) -> String {
        self.provider.url(key)
    }
}

#[async_trait]
impl BlobUpload for BlobService {
    async fn upload_file(&self, key: &str, path: &Path) -> Result<u64, BlobError> {
        let content = tokio::fs::read(path).await.map_err(|source| BlobError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let written = content.len() as u64;

        let location = ObjectPath::from(key.trim_matches('/'));
        self.store.put(&location, PutPayload::from(content)).await?;

        info!(url = %self.url(key), bytes = written, "published file to blob storage");
        Ok(written)
    }
}

fn build_store(provider: &BlobProvider) -> Result<Arc<dyn ObjectStore>, BlobError> {
    let store: Arc<dyn ObjectStore> = match provider {
        BlobProvider::S3 {
            access_key_id,
            secret_access_key,
            bucket,
        } => Arc::new(
            AmazonS3Builder::from_env()
                .with_bucket_name(bucket)
                .with_access_key_id(access_key_id)
                .with_secret_access_key(secret_access_key)
                .build()?,
        ),
        BlobProvider::Gcp {
            bucket,
            application_credentials,
            api_token,
        } => {
            let builder = GoogleCloudStorageBuilder::new().with_bucket_name(bucket);
            let builder = match (application_credentials, api_token) {
                (Some(path), _) => builder.with_service_account_path(path),
                (None, Some(token)) => builder.with_credentials(Arc::new(
                    StaticCredentialProvider::new(GcpCredential {
                        bearer: token.clone(),
                    }),
                )),
                (None, None) => {
                    return Err(ModelError::MissingEnv(ENV_GOOGLE_API_TOKEN.to_string()).into());
                }
            };
            Arc::new(builder.build()?)
        }
        BlobProvider::Azure {
            connection_string,
            bucket,
        } => {
            let conn = AzureConnection::parse(connection_string)?;
            Arc::new(
                MicrosoftAzureBuilder::new()
                    .with_account(conn.account_name)
                    .with_access_key(conn.account_key)
                    .with_container_name(bucket)
                    .build()?,
            )
        }
    };
    Ok(store)
}

/// Account credentials extracted from an Azure storage connection string.
#[derive(Debug, PartialEq, Eq)]
struct AzureConnection {
    account_name: String,
    account_key: String,
}

impl AzureConnection {
    /// Parse `Key=Value;Key=Value` pairs; values may themselves contain `=`.
    fn parse(s: &str) -> Result<Self, BlobError> {
        let mut account_name = None;
        let mut account_key = None;

        for part in s.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let Some((k, v)) = part.split_once('=') else {
                return Err(BlobError::InvalidConnectionString(format!(
                    "segment without '=': {part}"
                )));
            };
            match k {
                "AccountName" => account_name = Some(v.to_string()),
                "AccountKey" => account_key = Some(v.to_string()),
                _ => {}
            }
        }

        match (account_name, account_key) {
            (Some(account_name), Some(account_key)) => Ok(Self {
                account_name,
                account_key,
            }),
            _ => Err(BlobError::InvalidConnectionString(
                "AccountName and AccountKey are required".to_string(),
            )),
        }
    }
}
