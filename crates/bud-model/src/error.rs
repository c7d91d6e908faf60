use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("missing environment variable: {0}")]
    MissingEnv(String),
    #[error("unsupported blob provider: {0} (expected: s3|gcp|azure)")]
    UnsupportedProvider(String),
}
