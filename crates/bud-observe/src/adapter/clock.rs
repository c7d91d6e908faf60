use std::{
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use bud_model::{DEFAULT_LOG_PUBLISH_INTERVAL, ENV_LOG_PUBLISH_INTERVAL, EnvLookup};

use crate::LogError;

/// Tracks when the log file was last published and whether the next publication is due.
///
/// One clock belongs to one process; share it through an `Arc` when several loggers must follow
/// the same cadence.
#[derive(Debug)]
pub struct PublishClock {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl PublishClock {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Interval from `LOG_PUBLISH_INTERVAL` (seconds, default 30).
    pub fn from_env(env: &dyn EnvLookup) -> Result<Self, LogError> {
        let secs = match env.get(ENV_LOG_PUBLISH_INTERVAL) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| LogError::InvalidInterval(raw.clone()))?,
            None => DEFAULT_LOG_PUBLISH_INTERVAL,
        };
        Ok(Self::new(Duration::from_secs(secs)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn last_published(&self) -> Option<Instant> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `true` when `force` is set, nothing was published yet, or the interval has elapsed.
    pub fn is_due(&self, force: bool) -> bool {
        force
            || self
                .last_published()
                .is_none_or(|at| at.elapsed() >= self.interval)
    }

    /// Record a publication at the current instant.
    pub fn mark(&self) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }
}

impl Default for PublishClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_LOG_PUBLISH_INTERVAL))
    }
}
