use std::path::PathBuf;

use bud_model::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("failed to read requirements file {path}: {source}")]
    Requirements {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service responded with {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}
