//! Logger handles

use super::controller::BootstrapController;
use super::hooks::ErrorReport;
use super::level::Level;
use super::log_context::LogContext;
use std::fmt;
use std::sync::Arc;

pub(crate) const SOURCE_FILE: &str = file!();

/// Named handle for emitting records through a [`BootstrapController`]
///
/// Cheap to clone. Every entry point is `#[track_caller]`, so records point
/// at the line that called the handle, not at this crate.
///
/// # Example
///
/// ```
/// use bootlog::prelude::*;
///
/// let temp = tempfile::TempDir::new().unwrap();
/// let controller = BootstrapController::builder()
///     .temp_dir(temp.path())
///     .install_panic_hook(false)
///     .build()
///     .unwrap();
///
/// let log = controller
///     .get_logger("db")
///     .with_extra(LogContext::new().with_field("pool", "primary"));
/// log.info("connected");
/// log.log_with_context(Level::WARNING, "slow query", LogContext::new().with_field("ms", 812));
/// ```
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    controller: Arc<BootstrapController>,
    extra: LogContext,
}

impl Logger {
    pub(crate) fn new(name: String, controller: Arc<BootstrapController>) -> Self {
        Self {
            name: name.into(),
            controller,
            extra: LogContext::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn controller(&self) -> &Arc<BootstrapController> {
        &self.controller
    }

    /// Adapter handle whose records also carry `extra`
    #[must_use]
    pub fn with_extra(mut self, extra: LogContext) -> Self {
        self.extra.merge(&extra);
        self
    }

    /// Whether a record at `level` could reach any sink
    pub fn is_enabled_for(&self, level: Level) -> bool {
        level >= self.controller.effective_level()
    }

    #[track_caller]
    pub fn log(&self, level: Level, message: impl AsRef<str>) {
        self.log_at(level, message.as_ref(), None, None);
    }

    #[track_caller]
    pub fn log_with_context(&self, level: Level, message: impl AsRef<str>, context: LogContext) {
        self.log_at(level, message.as_ref(), Some(&context), None);
    }

    /// Entry point of the logging macros, which pass the enclosing function
    #[doc(hidden)]
    #[track_caller]
    pub fn log_at(
        &self,
        level: Level,
        message: &str,
        context: Option<&LogContext>,
        function: Option<&'static str>,
    ) {
        if !self.is_enabled_for(level) {
            return;
        }
        let record = self.controller.make_record(&self.name, level, message);
        let location = self.controller.resolver().caller(function);
        let record = record
            .with_location(location)
            .with_context(self.merged_context(context));
        self.controller.dispatch(&record);
    }

    /// Log `error` and its source chain at error severity
    #[track_caller]
    pub fn exception(&self, message: impl AsRef<str>, error: &(dyn std::error::Error + 'static)) {
        if !self.is_enabled_for(Level::ERROR) {
            return;
        }
        let location = self.controller.resolver().caller(None);
        let record = self
            .controller
            .make_record(&self.name, Level::ERROR, message.as_ref())
            .with_location(location)
            .with_context(self.merged_context(None))
            .with_exception(ErrorReport::from_error(error).traceback());
        self.controller.dispatch(&record);
    }

    fn merged_context(&self, call: Option<&LogContext>) -> LogContext {
        let mut context = self.controller.extra().clone();
        context.merge(&self.extra);
        if let Some(call) = call {
            context.merge(call);
        }
        context
    }

    #[inline]
    #[track_caller]
    pub fn debug3(&self, message: impl AsRef<str>) {
        self.log(Level::DEBUG3, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug2(&self, message: impl AsRef<str>) {
        self.log(Level::DEBUG2, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug1(&self, message: impl AsRef<str>) {
        self.log(Level::DEBUG1, message);
    }

    #[inline]
    #[track_caller]
    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(Level::DEBUG, message);
    }

    #[inline]
    #[track_caller]
    pub fn info(&self, message: impl AsRef<str>) {
        self.log(Level::INFO, message);
    }

    #[inline]
    #[track_caller]
    pub fn warning(&self, message: impl AsRef<str>) {
        self.log(Level::WARNING, message);
    }

    #[inline]
    #[track_caller]
    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(Level::WARN, message);
    }

    #[inline]
    #[track_caller]
    pub fn error(&self, message: impl AsRef<str>) {
        self.log(Level::ERROR, message);
    }

    #[inline]
    #[track_caller]
    pub fn critical(&self, message: impl AsRef<str>) {
        self.log(Level::CRITICAL, message);
    }

    #[inline]
    #[track_caller]
    pub fn fatal(&self, message: impl AsRef<str>) {
        self.log(Level::FATAL, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("extra", &self.extra)
            .finish()
    }
}
