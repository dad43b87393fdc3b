//! Core types: levels, records, formatting, sinks and the controller

pub mod caller;
pub mod config;
pub mod controller;
pub mod error;
pub mod formatter;
pub mod hooks;
pub mod level;
pub mod log_context;
pub mod logger;
pub mod metrics;
pub mod overflow_policy;
pub mod record;
pub mod sink;

pub use caller::{CallerResolver, Frame, SourceLocation, UNKNOWN_FILE, UNKNOWN_FUNCTION};
pub use config::{LoggingConfig, DEFAULT_FORMAT, DEFAULT_LEVEL};
pub use controller::{
    BootstrapController, ControllerBuilder, ControllerState, DEFAULT_LOG_FILE_NAME,
    DEFAULT_STDERR_LEVEL, SETTINGS_SUMMARY_LEVEL,
};
pub use error::{LoggerError, Result};
pub use formatter::{FormatStyle, Formatter, RECORD_FIELDS};
pub use hooks::{
    install_panic_hook, install_traceback_hook, panic_hook_installed, ErrorReport, Hook, HookChain,
    TRACEBACK_HOOK_TAG,
};
pub use level::{Level, LevelSpec, SeverityRegistry};
pub use log_context::{FieldValue, LogContext};
pub use logger::Logger;
pub use metrics::LoggerMetrics;
pub use overflow_policy::{OverflowCallback, OverflowPolicy};
pub use record::LogRecord;
pub use sink::{shared, SharedSink, Sink};
