use bud_blob::BlobError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error(
        "process group is not initialized: set up the multi-process state before using the logging adapter"
    )]
    Uninitialized,
    #[error("no blob key to publish the log file under")]
    MissingBlobKey,
    #[error("logger has no active log file to publish")]
    NoLogFile,
    #[error("invalid LOG_PUBLISH_INTERVAL: {0} (expected whole seconds)")]
    InvalidInterval(String),
    #[error("blob storage error: {0}")]
    Blob(#[from] BlobError),
}
