use std::collections::HashMap;

use crate::ModelError;

/// Source of configuration variables.
///
/// Everything that reads the process environment goes through this seam so callers can substitute a fixed map.
pub trait EnvLookup: Send + Sync {
    /// Value of `key`, or `None` when unset.
    fn get(&self, key: &str) -> Option<String>;

    /// Value of `key`, failing with [`ModelError::MissingEnv`] when unset.
    fn require(&self, key: &str) -> Result<String, ModelError> {
        self.get(key)
            .ok_or_else(|| ModelError::MissingEnv(key.to_string()))
    }

    /// Value of `key` only when it is set and non-empty.
    fn non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|v| !v.is_empty())
    }
}

/// The environment of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}
