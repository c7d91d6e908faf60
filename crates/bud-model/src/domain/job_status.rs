use std::fmt;

use serde::{Deserialize, Serialize};

/// State of a remote job as reported by the job service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    /// Job is accepted but not started yet.
    Pending,
    /// Job is currently executing.
    Running,
    /// Job was stopped on request.
    Stopped,
    /// Job finished successfully.
    Succeeded,
    /// Job finished with an error.
    Failed,
}

impl JobStatus {
    /// Returns `true` if the job is still active (pending or running).
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Running)
    }

    /// Returns `true` if the job won't transition further.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Stopped => "STOPPED",
            JobStatus::Succeeded => "SUCCEEDED",
            JobStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}
