use std::path::{Path, PathBuf};

use tracing::{Level, debug, error, info, trace, warn};

use crate::LoggerConfig;

/// Target of every event emitted through [`TracingSink`].
pub const TRAIN_TARGET: &str = "bud.train";

/// Leveled logger wrapped by the multi-process adapter.
pub trait LogSink: Send + Sync {
    fn enabled(&self, level: Level) -> bool;

    fn emit(&self, level: Level, message: &str);

    /// File the logger writes to, if any.
    fn log_file(&self) -> Option<&Path>;
}

/// Emits through the globally installed `tracing` subscriber.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    log_file: Option<PathBuf>,
}

impl TracingSink {
    pub fn new(log_file: Option<PathBuf>) -> Self {
        Self { log_file }
    }

    /// Sink publishing the file configured for the subscriber.
    pub fn from_config(cfg: &LoggerConfig) -> Self {
        Self::new(cfg.file.clone())
    }
}

impl LogSink for TracingSink {
    #[inline]
    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::ERROR => tracing::enabled!(target: TRAIN_TARGET, Level::ERROR),
            Level::WARN => tracing::enabled!(target: TRAIN_TARGET, Level::WARN),
            Level::INFO => tracing::enabled!(target: TRAIN_TARGET, Level::INFO),
            Level::DEBUG => tracing::enabled!(target: TRAIN_TARGET, Level::DEBUG),
            _ => tracing::enabled!(target: TRAIN_TARGET, Level::TRACE),
        }
    }

    #[inline]
    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::ERROR => error!(target: TRAIN_TARGET, "{message}"),
            Level::WARN => warn!(target: TRAIN_TARGET, "{message}"),
            Level::INFO => info!(target: TRAIN_TARGET, "{message}"),
            Level::DEBUG => debug!(target: TRAIN_TARGET, "{message}"),
            _ => trace!(target: TRAIN_TARGET, "{message}"),
        }
    }

    fn log_file(&self) -> Option<&Path> {
        self.log_file.as_deref()
    }
}
