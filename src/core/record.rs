//! Log record structure

use super::caller::SourceLocation;
use super::level::Level;
use super::log_context::LogContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

// Thread-local caches for thread information to avoid repeated allocations
thread_local! {
    static THREAD_ID_CACHE: RefCell<Option<String>> = const { RefCell::new(None) };
    static THREAD_NAME_CACHE: RefCell<Option<Option<String>>> = const { RefCell::new(None) };
}

/// Get cached thread ID, computing and caching it on first access
fn get_thread_id() -> String {
    THREAD_ID_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| format!("{:?}", std::thread::current().id()))
            .clone()
    })
}

/// Get cached thread name, computing and caching it on first access
fn get_thread_name() -> Option<String> {
    THREAD_NAME_CACHE.with(|cache| {
        cache
            .borrow_mut()
            .get_or_insert_with(|| std::thread::current().name().map(String::from))
            .clone()
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Name of the logger handle that emitted the record
    pub logger: String,
    pub level: Level,
    pub level_name: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub location: SourceLocation,
    pub thread_id: String,
    pub thread_name: Option<String>,
    pub process_id: u32,
    pub context: LogContext,
    /// Traceback or error chain, rendered below the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl LogRecord {
    /// Sanitize log message to prevent log injection attacks
    ///
    /// Replaces newlines, carriage returns, and tabs with escape sequences
    /// to prevent attackers from injecting fake log entries.
    fn sanitize_message(message: &str) -> String {
        message
            .replace('\n', "\\n")
            .replace('\r', "\\r")
            .replace('\t', "\\t")
    }

    pub fn new(
        logger: impl Into<String>,
        level: Level,
        level_name: impl Into<String>,
        message: &str,
    ) -> Self {
        Self {
            logger: logger.into(),
            level,
            level_name: level_name.into(),
            message: message.to_string(),
            timestamp: Utc::now(),
            location: SourceLocation::unknown(),
            thread_id: get_thread_id(),
            thread_name: get_thread_name(),
            process_id: std::process::id(),
            context: LogContext::new(),
            exception: None,
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    pub fn with_context(mut self, context: LogContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }

    /// Same record with a single-line message; exception text is untouched
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        self.message = Self::sanitize_message(&self.message);
        self
    }
}
