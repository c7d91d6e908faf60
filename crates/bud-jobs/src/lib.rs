mod error;
pub use error::JobError;

mod http;

mod client;
pub use client::{JobClient, RayJobClient};

mod submitter;
pub use submitter::{
    JobSubmitter, SubmitRequest, SubmitterConfig, filter_requirements, package_name,
    read_requirements,
};

mod callback;
pub use callback::CallbackClient;

mod dapr;
pub use dapr::{Activity, DaprClient, DaprConfig, NodeInfo, StateEntry, StateItem};

pub mod prelude {
    pub use crate::error::JobError;
    pub use crate::{JobClient, JobSubmitter, RayJobClient, SubmitRequest};
    pub use bud_model::{JobArgs, JobId, JobStatus, RuntimeEnvOverrides};
}
