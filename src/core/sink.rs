//! Sink trait for log output destinations

use super::{error::Result, formatter::Formatter, level::Level, record::LogRecord};
use parking_lot::Mutex;
use std::sync::Arc;

/// A leveled, formatted output destination
pub trait Sink: Send {
    fn threshold(&self) -> Level;
    fn set_threshold(&mut self, level: Level);
    fn set_formatter(&mut self, formatter: Formatter);

    /// Write a record that already passed the threshold
    fn write(&mut self, record: &LogRecord) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn name(&self) -> &str;

    /// Threshold check, then write
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        if record.level < self.threshold() {
            return Ok(());
        }
        self.write(record)
    }
}

/// A sink shared between the live sink set and replay targets
pub type SharedSink = Arc<Mutex<dyn Sink>>;

pub fn shared<S: Sink + 'static>(sink: S) -> Arc<Mutex<S>> {
    Arc::new(Mutex::new(sink))
}
