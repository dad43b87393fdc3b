//! Bootstrap buffer: in-memory queue replayed into a real sink later
//!
//! Before configuration the buffer captures every record regardless of its
//! own threshold. At configure time the queue is filtered to the final
//! sink's threshold and replayed into it in arrival order.

use crate::core::hooks::panic_message;
use crate::core::{
    Formatter, Level, LogRecord, LoggerError, OverflowCallback, OverflowPolicy, Result,
    SharedSink, Sink,
};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

pub const DEFAULT_CAPACITY: usize = 1000;

/// Outcome of handing queued records to a target
///
/// A record the target rejects, or panics on, is counted and the rest are
/// still delivered.
#[derive(Debug, Default)]
pub struct Replay {
    pub sent: usize,
    pub failed: usize,
    pub first_error: Option<LoggerError>,
}

impl Replay {
    fn fail(&mut self, error: LoggerError) {
        self.failed += 1;
        self.first_error.get_or_insert(error);
    }

    /// Records sent, or the first failure
    pub fn into_result(self) -> Result<usize> {
        match self.first_error {
            Some(e) => Err(e),
            None => Ok(self.sent),
        }
    }
}

pub struct BufferSink {
    name: String,
    capacity: usize,
    threshold: Level,
    formatter: Formatter,
    records: VecDeque<LogRecord>,
    target: Option<SharedSink>,
    flush_level: Option<Level>,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    dropped: u64,
}

impl BufferSink {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            threshold: Level::NOTSET,
            formatter: Formatter::bootstrap(),
            records: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            target: None,
            flush_level: None,
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
            dropped: 0,
        }
    }

    #[must_use]
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    #[must_use]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Push the whole queue to the target when a record at or above `level`
    /// arrives; ignored while no target is set
    #[must_use]
    pub fn with_flush_level(mut self, level: Level) -> Self {
        self.flush_level = Some(level);
        self
    }

    pub fn set_target(&mut self, target: SharedSink) {
        self.target = Some(target);
    }

    pub fn has_target(&self) -> bool {
        self.target.is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Records dropped because the queue was full with no target
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn records(&self) -> impl Iterator<Item = &LogRecord> {
        self.records.iter()
    }

    /// Keep only records at or above `level`
    pub fn retain_at_or_above(&mut self, level: Level) {
        self.records.retain(|record| record.level >= level);
    }

    /// Write every queued record to the target in arrival order
    ///
    /// The queue is always emptied. Without a target this is a no-op:
    /// nothing is discarded.
    pub fn flush_to_target(&mut self) -> Replay {
        let mut replay = Replay::default();
        let Some(target) = self.target.clone() else {
            return replay;
        };
        let mut target = target.lock();
        while let Some(record) = self.records.pop_front() {
            match panic::catch_unwind(AssertUnwindSafe(|| target.emit(&record))) {
                Ok(Ok(())) => replay.sent += 1,
                Ok(Err(e)) => replay.fail(e),
                Err(payload) => replay.fail(LoggerError::other(format!(
                    "sink '{}' panicked during replay: {}",
                    target.name(),
                    panic_message(&*payload)
                ))),
            }
        }
        replay
    }

    /// Filter to `target`'s threshold, then replay into it and empty the queue
    pub fn replay_into(&mut self, target: SharedSink) -> Replay {
        let threshold = target.lock().threshold();
        self.retain_at_or_above(threshold);
        self.set_target(target);
        self.flush_to_target()
    }

    fn overflow(&mut self) -> Result<()> {
        if let Some(target) = self.target.clone() {
            if let Some(oldest) = self.records.pop_front() {
                target.lock().emit(&oldest)?;
            }
            return Ok(());
        }

        match self.overflow_policy {
            OverflowPolicy::DropOldest => self.records.pop_front(),
            OverflowPolicy::DropNewest => self.records.pop_back(),
        };
        self.dropped += 1;

        if self.dropped == 1 {
            eprintln!(
                "[LOGGER WARNING] Bootstrap buffer '{}' is full ({} records) and logging is not \
                 configured yet; applying {} until configuration completes. \
                 The bootstrap temp file still has every record.",
                self.name, self.capacity, self.overflow_policy
            );
        }
        if let Some(ref callback) = self.on_overflow {
            callback(self.dropped);
        }
        Ok(())
    }
}

impl Sink for BufferSink {
    fn threshold(&self) -> Level {
        self.threshold
    }

    fn set_threshold(&mut self, level: Level) {
        self.threshold = level;
    }

    fn set_formatter(&mut self, formatter: Formatter) {
        self.formatter = formatter;
    }

    fn write(&mut self, record: &LogRecord) -> Result<()> {
        self.records.push_back(record.clone());
        if self.records.len() > self.capacity {
            self.overflow()?;
        }
        match self.flush_level {
            Some(level) if record.level >= level && self.target.is_some() => {
                self.flush_to_target().into_result().map(|_| ())
            }
            _ => Ok(()),
        }
    }

    /// Buffering is lossless before configuration, so the threshold is
    /// not applied here
    fn emit(&mut self, record: &LogRecord) -> Result<()> {
        self.write(record)
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_to_target().into_result().map(|_| ())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
