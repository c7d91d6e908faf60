use std::sync::Arc;

use bud_blob::{BlobService, BlobUpload};
use bud_model::EnvLookup;
use tracing::{Level, debug};

use crate::{LogError, LogSink, LoggerConfig, ProcessGroup, PublishClock, TracingSink};

/// Per-call options of [`MultiProcessLogger::log`].
#[derive(Debug, Clone)]
pub struct LogOptions {
    /// Only the main process emits.
    pub main_process_only: bool,
    /// Every process emits, one rank at a time in rank order.
    ///
    /// Has no effect when `main_process_only` is off.
    pub in_order: bool,
    /// Key the log file is published under; falls back to the logger's default key.
    pub blob_key: Option<String>,
    /// Last message of a run: publish the log file regardless of the interval.
    pub end: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            main_process_only: true,
            in_order: false,
            blob_key: None,
            end: false,
        }
    }
}

impl LogOptions {
    pub fn all_processes(mut self) -> Self {
        self.main_process_only = false;
        self
    }

    pub fn in_order(mut self) -> Self {
        self.in_order = true;
        self
    }

    pub fn with_blob_key(mut self, key: impl Into<String>) -> Self {
        self.blob_key = Some(key.into());
        self
    }

    pub fn end(mut self) -> Self {
        self.end = true;
        self
    }
}

/// Logger for jobs running as several cooperating processes.
///
/// Decides per message which processes emit it, and periodically publishes the log file to blob
/// storage so a run can be followed while it is still going.
pub struct MultiProcessLogger {
    sink: Arc<dyn LogSink>,
    group: Arc<dyn ProcessGroup>,
    uploader: Arc<dyn BlobUpload>,
    clock: Arc<PublishClock>,
    blob_key: Option<String>,
}

impl MultiProcessLogger {
    pub fn new(
        sink: Arc<dyn LogSink>,
        group: Arc<dyn ProcessGroup>,
        uploader: Arc<dyn BlobUpload>,
    ) -> Self {
        Self {
            sink,
            group,
            uploader,
            clock: Arc::new(PublishClock::default()),
            blob_key: None,
        }
    }

    /// Logger writing through `tracing` into the file of `cfg`, publishing to the blob provider
    /// selected by `env` at the `LOG_PUBLISH_INTERVAL` cadence.
    pub fn from_env(
        cfg: &LoggerConfig,
        group: Arc<dyn ProcessGroup>,
        env: &dyn EnvLookup,
    ) -> Result<Self, LogError> {
        let uploader = BlobService::from_env(env)?;
        let clock = PublishClock::from_env(env)?;
        Ok(Self::new(
            Arc::new(TracingSink::from_config(cfg)),
            group,
            Arc::new(uploader),
        )
        .with_clock(Arc::new(clock)))
    }

    pub fn with_clock(mut self, clock: Arc<PublishClock>) -> Self {
        self.clock = clock;
        self
    }

    /// Key used when a call does not name one.
    pub fn with_blob_key(mut self, key: impl Into<String>) -> Self {
        self.blob_key = Some(key.into());
        self
    }

    pub fn clock(&self) -> &PublishClock {
        &self.clock
    }

    /// Emit `message` on the processes selected by `opts`, then publish the log file when due.
    ///
    /// With `in_order`, every rank of the group takes part in one barrier round per rank,
    /// whether or not it has anything to emit.
    pub async fn log(&self, level: Level, message: &str, opts: LogOptions) -> Result<(), LogError> {
        if !self.group.is_initialized() {
            return Err(LogError::Uninitialized);
        }
        if !self.sink.enabled(level) {
            return Ok(());
        }

        let publish = self.clock.is_due(opts.end);
        let blob_key = opts.blob_key.as_deref().or(self.blob_key.as_deref());

        if opts.main_process_only && opts.in_order {
            let index = self.group.process_index();
            let mut outcome = Ok(());
            for rank in 0..self.group.num_processes() {
                if rank == index {
                    outcome = self.emit(level, message, publish, blob_key).await;
                }
                // Every rank reaches every barrier, also after a failed publish.
                self.group.wait_for_everyone().await;
            }
            outcome
        } else if !opts.main_process_only || self.group.is_main_process() {
            self.emit(level, message, publish, blob_key).await
        } else {
            Ok(())
        }
    }

    pub async fn error(&self, message: &str) -> Result<(), LogError> {
        self.log(Level::ERROR, message, LogOptions::default()).await
    }

    pub async fn warn(&self, message: &str) -> Result<(), LogError> {
        self.log(Level::WARN, message, LogOptions::default()).await
    }

    pub async fn info(&self, message: &str) -> Result<(), LogError> {
        self.log(Level::INFO, message, LogOptions::default()).await
    }

    pub async fn debug(&self, message: &str) -> Result<(), LogError> {
        self.log(Level::DEBUG, message, LogOptions::default()).await
    }

    async fn emit(
        &self,
        level: Level,
        message: &str,
        publish: bool,
        blob_key: Option<&str>,
    ) -> Result<(), LogError> {
        self.sink.emit(level, message);
        if publish {
            self.publish(blob_key).await?;
        }
        Ok(())
    }

    async fn publish(&self, blob_key: Option<&str>) -> Result<(), LogError> {
        let key = blob_key.ok_or(LogError::MissingBlobKey)?;
        let path = self.sink.log_file().ok_or(LogError::NoLogFile)?;

        let written = self.uploader.upload_file(key, path).await?;
        self.clock.mark();

        debug!(key, bytes = written, rank = self.group.process_index(), "log file published");
        Ok(())
    }
}
