mod constants;
pub use constants::*;

mod env_vars;
pub use env_vars::EnvVars;

mod job_args;
pub use job_args::JobArgs;

mod job_id;
pub use job_id::JobId;

mod job_status;
pub use job_status::JobStatus;

mod runtime_env;
pub use runtime_env::{PipSpec, RuntimeEnv, RuntimeEnvOverrides};
