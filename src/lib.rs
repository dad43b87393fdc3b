//! # bootlog
//!
//! Logging that is usable from the first line of `main`, before the
//! application has read its settings.
//!
//! Until [`BootstrapController::configure`] runs, every record goes to a
//! temp file (everything), to stderr (warnings and above) and to two
//! in-memory buffers. `configure` switches to the final stderr and file
//! sinks once, replaying the buffered records that pass the new thresholds.
//!
//! ## Features
//!
//! - **Nothing lost at startup**: records emitted before configuration are
//!   replayed in order into the configured sinks
//! - **Crash trail**: the bootstrap temp file survives a process that dies
//!   before configuring
//! - **Panic logging**: the process panic hook logs the panic, then runs
//!   the previous hook
//! - **Custom levels**: DEBUG3 to CRITICAL, plus any rank registered by name
//!
//! ```no_run
//! use bootlog::prelude::*;
//! use bootlog::info;
//!
//! let controller = BootstrapController::builder().build()?;
//! let log = controller.get_logger("main");
//! info!(log, "starting, pid {}", std::process::id());
//!
//! let config = LoggingConfig::from_json_str(
//!     r#"{"level": "INFO", "format": "%(asctime)s %(levelname)s %(message)s", "outputDirectory": "/var/log/app"}"#,
//! )?;
//! controller.configure(&config)?;
//! # Ok::<(), bootlog::LoggerError>(())
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

pub mod prelude {
    pub use crate::core::{
        BootstrapController, ControllerBuilder, ControllerState, ErrorReport, FieldValue,
        FormatStyle, HookChain, Level, LevelSpec, LogContext, Logger, LoggerError, LoggerMetrics,
        LoggingConfig, OverflowCallback, OverflowPolicy, Result, SeverityRegistry,
    };
}

pub use crate::core::{
    install_panic_hook, install_traceback_hook, BootstrapController, CallerResolver,
    ControllerBuilder, ControllerState, ErrorReport, FieldValue, FormatStyle, Formatter,
    HookChain, Level, LevelSpec, LogContext, LogRecord, Logger, LoggerError, LoggerMetrics,
    LoggingConfig, OverflowCallback, OverflowPolicy, Result, SeverityRegistry, SharedSink, Sink,
    SourceLocation,
};
