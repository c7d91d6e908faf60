mod logger;
pub use logger::*;

mod adapter;
pub use adapter::*;
