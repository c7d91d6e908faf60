use std::path::PathBuf;

use bud_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("blob storage is not configured: {0}")]
    Config(#[from] ModelError),

    #[error("invalid azure connection string: {0}")]
    InvalidConnectionString(String),

    #[error("object store request failed: {0}")]
    Store(#[from] object_store::Error),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}
