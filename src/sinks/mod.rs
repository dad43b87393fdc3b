//! Sink implementations

pub mod buffer;
pub mod stream;
pub mod temp_file;

pub use buffer::{BufferSink, Replay, DEFAULT_CAPACITY};
pub use stream::StreamSink;
pub use temp_file::{TempFileSink, TEMP_FILE_PREFIX};

// Re-export the trait alongside its implementations
pub use crate::core::Sink;
