//! Logger metrics for observability
//!
//! Counters for the bootstrap lifecycle: how many records went out, how many
//! a full bootstrap buffer had to drop, how many were replayed at configure
//! time, and how often a sink failed.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters shared by the controller and its sinks
///
/// # Example
///
/// ```
/// use bootlog::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
/// metrics.record_dispatched();
/// metrics.record_buffer_dropped();
///
/// assert_eq!(metrics.dispatched(), 1);
/// assert_eq!(metrics.buffer_dropped(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Records handed to the live sink set
    dispatched: AtomicU64,

    /// Sink writes that returned an error or panicked
    sink_failures: AtomicU64,

    /// Records evicted from a full bootstrap buffer
    buffer_dropped: AtomicU64,

    /// Buffered records written to a final sink during configure
    replayed: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dispatched: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
            buffer_dropped: AtomicU64::new(0),
            replayed: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn buffer_dropped(&self) -> u64 {
        self.buffer_dropped.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn replayed(&self) -> u64 {
        self.replayed.load(Ordering::Relaxed)
    }

    /// Returns the previous value, like the other `record_*` methods
    #[inline]
    pub fn record_dispatched(&self) -> u64 {
        self.dispatched.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failure(&self) -> u64 {
        self.sink_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failures(&self, count: u64) -> u64 {
        self.sink_failures.fetch_add(count, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_buffer_dropped(&self) -> u64 {
        self.buffer_dropped.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_replayed(&self, count: u64) -> u64 {
        self.replayed.fetch_add(count, Ordering::Relaxed)
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dispatched: AtomicU64::new(self.dispatched()),
            sink_failures: AtomicU64::new(self.sink_failures()),
            buffer_dropped: AtomicU64::new(self.buffer_dropped()),
            replayed: AtomicU64::new(self.replayed()),
        }
    }
}
