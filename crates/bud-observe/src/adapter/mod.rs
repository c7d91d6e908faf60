mod clock;
pub use clock::PublishClock;

mod error;
pub use error::LogError;

mod group;
pub use group::{LocalGroup, ProcessGroup};

mod sink;
pub use sink::{LogSink, TRAIN_TARGET, TracingSink};

mod multiprocess;
pub use multiprocess::{LogOptions, MultiProcessLogger};
