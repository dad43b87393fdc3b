//! Logging macros with `format!` arguments.
//!
//! Unlike the [`Logger`](crate::Logger) methods, the macros also record the
//! name of the enclosing function, and skip formatting entirely when the
//! level cannot reach any sink.
//!
//! # Examples
//!
//! ```
//! use bootlog::prelude::*;
//! use bootlog::{info, log, warning};
//!
//! let temp = tempfile::TempDir::new().unwrap();
//! let controller = BootstrapController::builder()
//!     .temp_dir(temp.path())
//!     .install_panic_hook(false)
//!     .build()
//!     .unwrap();
//! let logger = controller.get_logger("server");
//!
//! info!(logger, "Server started");
//!
//! let port = 8080;
//! warning!(logger, "Port {} is already bound, retrying", port);
//!
//! log!(logger, Level::INFO, context: LogContext::new().with_field("port", 8080), "listening");
//! ```

/// Log at an explicit level, optionally with per-call context.
///
/// # Examples
///
/// ```
/// # use bootlog::prelude::*;
/// # let temp = tempfile::TempDir::new().unwrap();
/// # let controller = BootstrapController::builder().temp_dir(temp.path()).install_panic_hook(false).build().unwrap();
/// # let logger = controller.get_logger("app");
/// use bootlog::log;
/// log!(logger, Level::INFO, "Simple message");
/// log!(logger, Level::ERROR, "Error code: {}", 500);
/// log!(logger, Level::new(15), context: LogContext::new().with_field("user", "ana"), "login");
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, context: $context:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled_for(level) {
            logger.log_at(
                level,
                &format!($($arg)+),
                Some(&$context),
                Some($crate::__function_name!()),
            );
        }
    }};
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        if logger.is_enabled_for(level) {
            logger.log_at(level, &format!($($arg)+), None, Some($crate::__function_name!()));
        }
    }};
}

/// Name of the enclosing function, without its module path
#[doc(hidden)]
#[macro_export]
macro_rules! __function_name {
    () => {{
        fn __f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::core::caller::function_name(type_name_of(__f))
    }};
}

/// Log at DEBUG3, the most verbose level.
#[macro_export]
macro_rules! debug3 {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG3, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug2 {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG2, $($arg)+)
    };
}

#[macro_export]
macro_rules! debug1 {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG1, $($arg)+)
    };
}

/// Log at DEBUG (same rank as DEBUG1).
#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::DEBUG, $($arg)+)
    };
}

/// Log an info-level message.
///
/// # Examples
///
/// ```
/// # use bootlog::prelude::*;
/// # let temp = tempfile::TempDir::new().unwrap();
/// # let controller = BootstrapController::builder().temp_dir(temp.path()).install_panic_hook(false).build().unwrap();
/// # let logger = controller.get_logger("app");
/// use bootlog::info;
/// info!(logger, "Application started");
/// info!(logger, "Processing {} items", 100);
/// ```
#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::INFO, $($arg)+)
    };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARNING, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::WARN, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::ERROR, $($arg)+)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::CRITICAL, $($arg)+)
    };
}

/// Log at FATAL (same rank as CRITICAL).
#[macro_export]
macro_rules! fatal {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, $crate::Level::FATAL, $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{BootstrapController, Level, LogContext, LoggingConfig};
    use crate::FormatStyle;
    use std::fs;
    use tempfile::TempDir;

    fn configured(temp: &TempDir, format: &str) -> std::sync::Arc<BootstrapController> {
        let controller = BootstrapController::builder()
            .temp_dir(temp.path())
            .stderr_writer(Box::new(std::io::sink()))
            .install_panic_hook(false)
            .build()
            .unwrap();
        let config = LoggingConfig::new(temp.path())
            .with_level("DEBUG3")
            .with_format(format, FormatStyle::Percent);
        controller.configure(&config).unwrap();
        controller
    }

    fn lines(temp: &TempDir) -> Vec<String> {
        fs::read_to_string(temp.path().join("bootlog.log"))
            .unwrap()
            .lines()
            .filter(|l| !l.contains("Settings:"))
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_macros_capture_function_and_line() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let controller = configured(&temp, "%(funcName)s:%(lineno)d %(message)s");
        let logger = controller.get_logger("m");

        let line = line!() + 1;
        info!(logger, "Items: {}", 100);

        assert_eq!(
            lines(&temp),
            [format!("test_macros_capture_function_and_line:{} Items: 100", line)]
        );
    }

    #[test]
    fn test_function_name_inside_closure() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let controller = configured(&temp, "%(funcName)s %(message)s");
        let logger = controller.get_logger("m");

        let run = || warning!(logger, "from closure");
        run();

        assert_eq!(lines(&temp), ["test_function_name_inside_closure from closure"]);
    }

    #[test]
    fn test_every_level_macro() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let controller = configured(&temp, "%(levelname)s %(message)s");
        let logger = controller.get_logger("m");

        debug3!(logger, "a");
        debug2!(logger, "b");
        debug1!(logger, "c");
        debug!(logger, "d");
        info!(logger, "e");
        warning!(logger, "f");
        warn!(logger, "g");
        error!(logger, "h");
        critical!(logger, "i");
        fatal!(logger, "j");

        assert_eq!(
            lines(&temp),
            [
                "DEBUG3 a", "DEBUG2 b", "DEBUG1 c", "DEBUG1 d", "INFO e", "WARNING f", "WARNING g",
                "ERROR h", "CRITICAL i", "CRITICAL j",
            ]
        );
    }

    #[test]
    fn test_log_macro_with_context() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let controller = BootstrapController::builder()
            .temp_dir(temp.path())
            .stderr_writer(Box::new(std::io::sink()))
            .extra_field("user", "-")
            .install_panic_hook(false)
            .build()
            .unwrap();
        let config = LoggingConfig::new(temp.path())
            .with_level("INFO")
            .with_format("%(user)s %(message)s", FormatStyle::Percent);
        controller.configure(&config).unwrap();
        let logger = controller.get_logger("m");

        log!(logger, Level::INFO, context: LogContext::new().with_field("user", "ana"), "login #{}", 3);
        log!(logger, Level::INFO, "anonymous");

        assert_eq!(lines(&temp), ["ana login #3", "- anonymous"]);
    }
}
