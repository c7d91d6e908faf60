use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{EnvVars, ModelError};

/// Keys of [`RuntimeEnv`] that have their own field and cannot be set as extra keys.
const NAMED_FIELDS: [&str; 4] = ["working_dir", "excludes", "pip", "env_vars"];

/// Python packages installed into the job environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipSpec {
    pub packages: Vec<String>,
    pub pip_version: String,
}

/// Execution environment of a submitted job.
///
/// Built fresh for each submission and serialized into the job service's `runtime_env` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeEnv {
    /// Local directory uploaded as the job's working directory.
    pub working_dir: String,
    /// File names left out of the upload.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excludes: Vec<String>,
    pub pip: PipSpec,
    #[serde(default, skip_serializing_if = "EnvVars::is_empty")]
    pub env_vars: EnvVars,
    /// Any other runtime environment key (`py_modules`, `conda`, `container`, ...), passed
    /// through to the job service as is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RuntimeEnv {
    /// Apply caller overrides; every field that is set wins over the current value.
    ///
    /// Environment variables and extra keys are merged key by key. An extra key naming one of
    /// the typed fields is rejected.
    pub fn apply(mut self, overrides: RuntimeEnvOverrides) -> Result<Self, ModelError> {
        if let Some(key) = overrides
            .extra
            .keys()
            .find(|k| NAMED_FIELDS.contains(&k.as_str()))
        {
            return Err(ModelError::InvalidArgument(format!(
                "runtime_env key `{key}` must be set through its typed override"
            )));
        }

        if let Some(dir) = overrides.working_dir {
            self.working_dir = dir;
        }
        if let Some(excludes) = overrides.excludes {
            self.excludes = excludes;
        }
        if let Some(pip) = overrides.pip {
            self.pip = pip;
        }
        self.env_vars = self.env_vars.merged(&overrides.env_vars);
        self.extra.extend(overrides.extra);
        Ok(self)
    }
}

/// Caller-supplied changes to the computed [`RuntimeEnv`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeEnvOverrides {
    pub working_dir: Option<String>,
    pub excludes: Option<Vec<String>>,
    pub pip: Option<PipSpec>,
    pub env_vars: EnvVars,
    pub extra: Map<String, Value>,
}

impl RuntimeEnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = Some(excludes.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_pip(mut self, pip: PipSpec) -> Self {
        self.pip = Some(pip);
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.set(key, value);
        self
    }

    /// Set a runtime environment key without a typed field, e.g. `py_modules`.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> RuntimeEnv {
        RuntimeEnv {
            working_dir: "./".into(),
            excludes: vec![".env".into()],
            pip: PipSpec {
                packages: vec!["torch".into()],
                pip_version: "==23.3.1".into(),
            },
            env_vars: EnvVars::new().with("BLOB_PROVIDER", "s3").with("A", "1"),
            extra: Map::new(),
        }
    }

    #[test]
    fn empty_overrides_change_nothing() {
        assert_eq!(base().apply(RuntimeEnvOverrides::new()).unwrap(), base());
    }

    #[test]
    fn overrides_win_and_env_merges_per_key() {
        let env = base().apply(
            RuntimeEnvOverrides::new()
                .with_working_dir("/srv/job")
                .with_env("A", "2")
                .with_env("EXTRA", "yes"),
        )
        .unwrap();

        assert_eq!(env.working_dir, "/srv/job");
        assert_eq!(env.excludes, vec![".env"]);
        assert_eq!(env.env_vars.get("A"), Some("2"));
        assert_eq!(env.env_vars.get("BLOB_PROVIDER"), Some("s3"));
        assert_eq!(env.env_vars.get("EXTRA"), Some("yes"));
    }

    #[test]
    fn serializes_in_job_service_shape() {
        let json = serde_json::to_value(base()).unwrap();

        assert_eq!(json["working_dir"], "./");
        assert_eq!(json["excludes"][0], ".env");
        assert_eq!(json["pip"]["packages"][0], "torch");
        assert_eq!(json["pip"]["pip_version"], "==23.3.1");
        assert_eq!(json["env_vars"]["BLOB_PROVIDER"], "s3");
        assert_eq!(json.as_object().unwrap().len(), 4);
    }

    #[test]
    fn extra_keys_are_flattened_into_the_descriptor() {
        let env = base()
            .apply(
                RuntimeEnvOverrides::new()
                    .with_field("py_modules", vec!["modules", "config"])
                    .with_field("conda", "train-env"),
            )
            .unwrap();

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["py_modules"][1], "config");
        assert_eq!(json["conda"], "train-env");
        assert_eq!(json["working_dir"], "./");

        let back: RuntimeEnv = serde_json::from_value(json).unwrap();
        assert_eq!(back, env);
    }

    #[test]
    fn extra_key_cannot_shadow_a_typed_field() {
        let err = base()
            .apply(RuntimeEnvOverrides::new().with_field("env_vars", serde_json::json!({})))
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidArgument(ref m) if m.contains("env_vars")));
    }
}
