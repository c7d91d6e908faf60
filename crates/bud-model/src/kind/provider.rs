use std::str::FromStr;

use crate::{
    ENV_AWS_ACCESS_KEY_ID, ENV_AWS_BUCKET_NAME, ENV_AWS_SECRET_ACCESS_KEY,
    ENV_AZURE_BUCKET_NAME, ENV_AZURE_STORAGE_CONNECTION_STRING, ENV_BLOB_PROVIDER,
    ENV_GOOGLE_API_TOKEN, ENV_GOOGLE_APPLICATION_CREDENTIALS, ENV_GOOGLE_BUCKET_NAME,
    DEFAULT_BLOB_PROVIDER, EnvLookup, EnvVars, ModelError,
};

/// Blob storage provider together with the credentials it needs.
///
/// Each variant carries exactly the settings read for that provider, so the set of forwarded
/// credential variables follows from the variant alone.
#[derive(Clone, PartialEq, Eq)]
pub enum BlobProvider {
    /// Amazon S3.
    S3 {
        access_key_id: String,
        secret_access_key: String,
        bucket: String,
    },
    /// Google Cloud Storage.
    Gcp {
        bucket: String,
        /// Path to a service account JSON file.
        application_credentials: Option<String>,
        /// Bearer token used when no service account file is given.
        api_token: Option<String>,
    },
    /// Azure Blob Storage.
    Azure {
        connection_string: String,
        /// Container name.
        bucket: String,
    },
}

/// Provider discriminator without credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProviderName {
    S3,
    Gcp,
    Azure,
}

impl FromStr for ProviderName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "s3" => Ok(ProviderName::S3),
            "gcp" => Ok(ProviderName::Gcp),
            "azure" => Ok(ProviderName::Azure),
            other => Err(ModelError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl BlobProvider {
    /// Read the active provider (`BLOB_PROVIDER`, default `s3`) and its credentials.
    ///
    /// A required variable that is not set fails with [`ModelError::MissingEnv`].
    pub fn from_env(env: &dyn EnvLookup) -> Result<Self, ModelError> {
        let name = env
            .get(ENV_BLOB_PROVIDER)
            .unwrap_or_else(|| DEFAULT_BLOB_PROVIDER.to_string());

        match name.parse::<ProviderName>()? {
            ProviderName::S3 => Ok(BlobProvider::S3 {
                access_key_id: env.require(ENV_AWS_ACCESS_KEY_ID)?,
                secret_access_key: env.require(ENV_AWS_SECRET_ACCESS_KEY)?,
                bucket: env.require(ENV_AWS_BUCKET_NAME)?,
            }),
            ProviderName::Gcp => Ok(BlobProvider::Gcp {
                bucket: env.require(ENV_GOOGLE_BUCKET_NAME)?,
                application_credentials: env.non_empty(ENV_GOOGLE_APPLICATION_CREDENTIALS),
                api_token: env.non_empty(ENV_GOOGLE_API_TOKEN),
            }),
            ProviderName::Azure => Ok(BlobProvider::Azure {
                connection_string: env.require(ENV_AZURE_STORAGE_CONNECTION_STRING)?,
                bucket: env.require(ENV_AZURE_BUCKET_NAME)?,
            }),
        }
    }

    /// Short symbolic name, the value accepted by `BLOB_PROVIDER`.
    pub fn name(&self) -> &'static str {
        match self {
            BlobProvider::S3 { .. } => "s3",
            BlobProvider::Gcp { .. } => "gcp",
            BlobProvider::Azure { .. } => "azure",
        }
    }

    pub fn bucket(&self) -> &str {
        match self {
            BlobProvider::S3 { bucket, .. }
            | BlobProvider::Gcp { bucket, .. }
            | BlobProvider::Azure { bucket, .. } => bucket,
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            BlobProvider::S3 { .. } => "s3",
            BlobProvider::Gcp { .. } => "gs",
            BlobProvider::Azure { .. } => "azure",
        }
    }

    /// Full URL of `key` inside the provider's bucket.
    pub fn url(&self, key: &str) -> String {
        format!(
            "{}://{}/{}",
            self.scheme(),
            self.bucket().trim_matches('/'),
            key.trim_matches('/')
        )
    }

    /// Credential variables forwarded to a remote job so it can reach the same bucket.
    pub fn env_vars(&self) -> EnvVars {
        let mut vars = EnvVars::new();
        match self {
            BlobProvider::S3 {
                access_key_id,
                secret_access_key,
                bucket,
            } => {
                vars.set(ENV_AWS_ACCESS_KEY_ID, access_key_id.as_str());
                vars.set(ENV_AWS_SECRET_ACCESS_KEY, secret_access_key.as_str());
                vars.set(ENV_AWS_BUCKET_NAME, bucket.as_str());
            }
            BlobProvider::Gcp {
                bucket,
                application_credentials,
                api_token,
            } => {
                vars.set(ENV_GOOGLE_BUCKET_NAME, bucket.as_str());
                if let Some(path) = application_credentials {
                    vars.set(ENV_GOOGLE_APPLICATION_CREDENTIALS, path.as_str());
                }
                if let Some(token) = api_token {
                    vars.set(ENV_GOOGLE_API_TOKEN, token.as_str());
                }
            }
            BlobProvider::Azure {
                connection_string,
                bucket,
            } => {
                vars.set(ENV_AZURE_STORAGE_CONNECTION_STRING, connection_string.as_str());
                vars.set(ENV_AZURE_BUCKET_NAME, bucket.as_str());
            }
        }
        vars
    }
}

// Credentials stay out of debug output.
impl std::fmt::Debug for BlobProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobProvider")
            .field("name", &self.name())
            .field("bucket", &self.bucket())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn keys(vars: &EnvVars) -> Vec<&str> {
        vars.keys().collect()
    }

    #[test]
    fn defaults_to_s3() {
        let vars = env(&[
            ("AWS_ACCESS_KEY_ID", "id"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
            ("AWS_BUCKET_NAME", "bucket"),
        ]);
        let provider = BlobProvider::from_env(&vars).unwrap();

        assert_eq!(provider.name(), "s3");
        assert_eq!(
            keys(&provider.env_vars()),
            vec!["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_BUCKET_NAME"]
        );
        assert_eq!(provider.url("/runs/log.txt"), "s3://bucket/runs/log.txt");
    }

    #[test]
    fn s3_missing_secret_is_fatal() {
        let vars = env(&[("AWS_ACCESS_KEY_ID", "id"), ("AWS_BUCKET_NAME", "bucket")]);
        assert_eq!(
            BlobProvider::from_env(&vars),
            Err(ModelError::MissingEnv("AWS_SECRET_ACCESS_KEY".into()))
        );
    }

    #[test]
    fn gcp_forwards_optional_keys_only_when_present() {
        let bare = env(&[("BLOB_PROVIDER", "gcp"), ("GOOGLE_BUCKET_NAME", "b")]);
        let provider = BlobProvider::from_env(&bare).unwrap();
        assert_eq!(keys(&provider.env_vars()), vec!["GOOGLE_BUCKET_NAME"]);
        assert_eq!(provider.url("k"), "gs://b/k");

        let full = env(&[
            ("BLOB_PROVIDER", "gcp"),
            ("GOOGLE_BUCKET_NAME", "b"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/sa.json"),
            ("GOOGLE_API_TOKEN", "tok"),
        ]);
        let provider = BlobProvider::from_env(&full).unwrap();
        assert_eq!(
            keys(&provider.env_vars()),
            vec![
                "GOOGLE_BUCKET_NAME",
                "GOOGLE_APPLICATION_CREDENTIALS",
                "GOOGLE_API_TOKEN"
            ]
        );
    }

    #[test]
    fn gcp_ignores_empty_optional_keys() {
        let vars = env(&[
            ("BLOB_PROVIDER", "gcp"),
            ("GOOGLE_BUCKET_NAME", "b"),
            ("GOOGLE_API_TOKEN", ""),
        ]);
        let provider = BlobProvider::from_env(&vars).unwrap();
        assert_eq!(keys(&provider.env_vars()), vec!["GOOGLE_BUCKET_NAME"]);
    }

    #[test]
    fn azure_requires_connection_string() {
        let vars = env(&[("BLOB_PROVIDER", "azure"), ("AZURE_BUCKET_NAME", "c")]);
        assert_eq!(
            BlobProvider::from_env(&vars),
            Err(ModelError::MissingEnv(
                "AZURE_STORAGE_CONNECTION_STRING".into()
            ))
        );

        let vars = env(&[
            ("BLOB_PROVIDER", "azure"),
            ("AZURE_BUCKET_NAME", "c"),
            ("AZURE_STORAGE_CONNECTION_STRING", "AccountName=a;AccountKey=k"),
        ]);
        let provider = BlobProvider::from_env(&vars).unwrap();
        assert_eq!(
            keys(&provider.env_vars()),
            vec!["AZURE_STORAGE_CONNECTION_STRING", "AZURE_BUCKET_NAME"]
        );
        assert_eq!(provider.url("a/b/"), "azure://c/a/b");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let vars = env(&[("BLOB_PROVIDER", "minio")]);
        assert_eq!(
            BlobProvider::from_env(&vars),
            Err(ModelError::UnsupportedProvider("minio".into()))
        );
    }

    #[test]
    fn debug_hides_credentials() {
        let provider = BlobProvider::S3 {
            access_key_id: "id".into(),
            secret_access_key: "very-secret".into(),
            bucket: "bucket".into(),
        };
        let out = format!("{provider:?}");
        assert!(out.contains("bucket"));
        assert!(!out.contains("very-secret"));
    }
}
