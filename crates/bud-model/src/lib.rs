mod domain;
pub use domain::*;

mod kind;
pub use kind::BlobProvider;

mod env;
pub use env::{EnvLookup, ProcessEnv};

mod error;
pub use error::ModelError;
