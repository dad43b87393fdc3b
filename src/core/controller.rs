//! Bootstrap controller
//!
//! Owns the process's active sink set and moves it, exactly once, from the
//! bootstrap configuration to the final one:
//!
//! ```text
//! Unconfigured: temp file (NOTSET), stderr (WARNING),
//!               stderr buffer, file buffer (both lossless)
//! Configured:   stderr, {output_directory}/bootlog.log (configured level)
//! ```
//!
//! Every record logged before `configure` is written to the temp file and
//! queued in both buffers. `configure` filters the queues to the final
//! thresholds and replays them, so nothing emitted during startup is lost
//! and nothing is written twice.

use super::caller::{CallerResolver, SourceLocation};
use super::config::LoggingConfig;
use super::error::{LoggerError, Result};
use super::formatter::Formatter;
use super::hooks::{self, ErrorReport, HookChain};
use super::level::{Level, SeverityRegistry};
use super::log_context::{FieldValue, LogContext};
use super::logger::Logger;
use super::metrics::LoggerMetrics;
use super::overflow_policy::{OverflowCallback, OverflowPolicy};
use super::record::LogRecord;
use super::sink::{shared, SharedSink, Sink};
use crate::sinks::{BufferSink, StreamSink, TempFileSink, DEFAULT_CAPACITY};
use parking_lot::{Mutex, RwLock};
use std::cell::Cell;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub(crate) const SOURCE_FILE: &str = file!();

pub const DEFAULT_LOG_FILE_NAME: &str = "bootlog.log";
pub const DEFAULT_STDERR_LEVEL: Level = Level::WARNING;

/// Level of the one-line settings summary written at configure time
pub const SETTINGS_SUMMARY_LEVEL: Level = Level::DEBUG1;

/// Logger name used for records the controller emits itself
const CONTROLLER_LOGGER: &str = "bootlog";

thread_local! {
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as dispatching; `None` on re-entry
struct DispatchGuard;

impl DispatchGuard {
    fn enter() -> Option<Self> {
        DISPATCHING.with(|flag| if flag.replace(true) { None } else { Some(DispatchGuard) })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(false));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Unconfigured,
    Configured,
}

struct BootstrapSinks {
    temp_file: Arc<Mutex<TempFileSink>>,
    stderr_buffer: Arc<Mutex<BufferSink>>,
    file_buffer: Arc<Mutex<BufferSink>>,
}

struct LiveSinks {
    state: ControllerState,
    sinks: Vec<SharedSink>,
    bootstrap: Option<BootstrapSinks>,
    file: Option<Arc<Mutex<StreamSink>>>,
}

/// Temporarily replaces the live sink list, restoring it on drop
struct SinkScope<'a> {
    slot: &'a mut Vec<SharedSink>,
    saved: Vec<SharedSink>,
}

impl<'a> SinkScope<'a> {
    fn new(slot: &'a mut Vec<SharedSink>, sinks: Vec<SharedSink>) -> Self {
        let saved = std::mem::replace(slot, sinks);
        Self { slot, saved }
    }

    fn sinks(&self) -> &[SharedSink] {
        self.slot.as_slice()
    }
}

impl Drop for SinkScope<'_> {
    fn drop(&mut self) {
        std::mem::swap(self.slot, &mut self.saved);
    }
}

/// Process-wide logging controller
///
/// Built once at startup through [`ControllerBuilder`] and shared as an
/// `Arc`; every [`Logger`] handle refers back to it.
///
/// # Example
///
/// ```no_run
/// use bootlog::{BootstrapController, LoggingConfig};
///
/// let controller = BootstrapController::builder().build().unwrap();
/// let log = controller.get_logger("startup");
/// log.warning("no settings file yet, using defaults");
///
/// controller.configure(&LoggingConfig::new("/var/log/app").with_level("INFO")).unwrap();
/// log.info("configured");
/// ```
pub struct BootstrapController {
    registry: Arc<SeverityRegistry>,
    resolver: CallerResolver,
    extra: LogContext,
    stderr: Arc<Mutex<StreamSink>>,
    live: RwLock<LiveSinks>,
    effective_level: AtomicU32,
    sanitize_messages: bool,
    log_file_name: String,
    temp_file_path: PathBuf,
    metrics: Arc<LoggerMetrics>,
}

impl BootstrapController {
    #[must_use]
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    /// Handle for emitting records under `name`
    pub fn get_logger(self: &Arc<Self>, name: impl Into<String>) -> Logger {
        Logger::new(name.into(), Arc::clone(self))
    }

    pub fn state(&self) -> ControllerState {
        self.live.read().state
    }

    pub fn is_configured(&self) -> bool {
        self.state() == ControllerState::Configured
    }

    pub fn registry(&self) -> &SeverityRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &CallerResolver {
        &self.resolver
    }

    /// Context merged into every record (`hostname` at minimum)
    pub fn extra(&self) -> &LogContext {
        &self.extra
    }

    pub fn metrics(&self) -> &LoggerMetrics {
        &self.metrics
    }

    /// Lowest level any sink can accept: NOTSET until configured
    pub fn effective_level(&self) -> Level {
        Level::new(self.effective_level.load(Ordering::Acquire))
    }

    /// The bootstrap temp file; deleted by a successful `configure`
    pub fn temp_file_path(&self) -> &Path {
        &self.temp_file_path
    }

    /// The configured log file, once there is one
    pub fn log_file_path(&self) -> Option<PathBuf> {
        let live = self.live.read();
        let file = live.file.as_ref()?;
        let path = file.lock().path().map(Path::to_path_buf);
        path
    }

    /// Names of the sinks currently receiving records
    pub fn sink_names(&self) -> Vec<String> {
        self.live
            .read()
            .sinks
            .iter()
            .map(|sink| sink.lock().name().to_string())
            .collect()
    }

    /// Build a record whose level name comes from the registry
    pub fn make_record(&self, logger: &str, level: Level, message: &str) -> LogRecord {
        let record = LogRecord::new(logger, level, self.registry.name_of(level), message);
        if self.sanitize_messages {
            record.sanitized()
        } else {
            record
        }
    }

    /// Switch to the final configuration
    ///
    /// Runs once. Everything that can fail (level lookup, formatter, opening
    /// the log file) happens before any sink is touched; on error the
    /// controller stays unconfigured and keeps capturing. A second call
    /// reports the misuse on stderr and returns
    /// [`LoggerError::AlreadyConfigured`] without touching the sinks.
    #[track_caller]
    pub fn configure(&self, config: &LoggingConfig) -> Result<()> {
        let _dispatch = DispatchGuard::enter()
            .ok_or_else(|| LoggerError::other("configure called while a record is being dispatched"))?;
        let location = self.resolver.caller(None);

        let mut live = self.live.write();
        if live.state == ControllerState::Configured {
            drop(live);
            let record = self
                .make_record(CONTROLLER_LOGGER, Level::ERROR, "Configure logger called twice, this is unexpected")
                .with_location(location)
                .with_context(self.extra.clone());
            let stderr: SharedSink = self.stderr.clone();
            Self::emit_to(&[stderr], &record, &self.metrics);
            return Err(LoggerError::AlreadyConfigured);
        }

        let level = self.registry.resolve(&config.level)?;
        let formatter = Formatter::new(&config.format, config.date_format.as_deref(), config.style)?;
        formatter.validate_fields(self.extra.keys())?;
        let summary = format!("Settings: {}", serde_json::to_string(config)?);

        let path = config.output_directory().join(&self.log_file_name);
        let file = shared(StreamSink::append_file(&path, level, formatter.clone())?);

        let bootstrap = live
            .bootstrap
            .take()
            .ok_or_else(|| LoggerError::other("bootstrap sinks missing before configure"))?;

        {
            let mut stderr = self.stderr.lock();
            stderr.set_threshold(level);
            stderr.set_formatter(formatter);
        }
        let stderr: SharedSink = self.stderr.clone();
        let file_sink: SharedSink = file.clone();
        live.sinks = vec![stderr.clone(), file_sink.clone()];
        live.file = Some(file);
        self.effective_level.store(level.rank(), Ordering::Release);

        let summary = self
            .make_record(CONTROLLER_LOGGER, SETTINGS_SUMMARY_LEVEL, &summary)
            .with_location(location.clone())
            .with_context(self.extra.clone());
        {
            let scope = SinkScope::new(&mut live.sinks, vec![file_sink.clone()]);
            Self::emit_to(scope.sinks(), &summary, &self.metrics);
        }

        let replays = [
            ("stderr_buffer", bootstrap.stderr_buffer.lock().replay_into(stderr)),
            ("file_buffer", bootstrap.file_buffer.lock().replay_into(file_sink)),
        ];
        for (buffer, replay) in replays {
            self.metrics.record_replayed(replay.sent as u64);
            if let Some(e) = replay.first_error {
                self.metrics.record_sink_failures(replay.failed as u64);
                eprintln!(
                    "[LOGGER ERROR] Replaying '{}': {} of {} records failed, first error: {}",
                    buffer,
                    replay.failed,
                    replay.sent + replay.failed,
                    e
                );
            }
        }

        if let Err(e) = bootstrap.temp_file.lock().remove() {
            let warning = self
                .make_record(
                    CONTROLLER_LOGGER,
                    Level::WARNING,
                    &format!("Could not remove bootstrap log file: {}", e),
                )
                .with_location(location)
                .with_context(self.extra.clone());
            Self::emit_to(&live.sinks, &warning, &self.metrics);
        }

        live.state = ControllerState::Configured;
        Ok(())
    }

    /// Send `record` to every live sink
    ///
    /// A call made while this thread is already dispatching (a sink that
    /// logs, or panics into the panic hook) goes straight to stderr.
    pub fn dispatch(&self, record: &LogRecord) {
        let Some(_guard) = DispatchGuard::enter() else {
            eprintln!(
                "[LOGGER WARNING] Re-entrant log call: {} - {}",
                record.level_name, record.message
            );
            return;
        };
        let live = self.live.read();
        Self::emit_to(&live.sinks, record, &self.metrics);
    }

    /// Flush every live sink
    pub fn flush(&self) -> Result<()> {
        let live = self.live.read();
        for sink in &live.sinks {
            sink.lock().flush()?;
        }
        Ok(())
    }

    /// Log an uncaught failure at error severity
    pub fn log_uncaught(&self, report: &ErrorReport) {
        let record = self
            .make_record(CONTROLLER_LOGGER, Level::ERROR, "Uncaught exception")
            .with_location(report.location.clone().unwrap_or_else(SourceLocation::unknown))
            .with_context(self.extra.clone())
            .with_exception(report.traceback());
        self.dispatch(&record);
    }

    /// One failing or panicking sink does not keep the record from the rest
    fn emit_to(sinks: &[SharedSink], record: &LogRecord, metrics: &LoggerMetrics) {
        metrics.record_dispatched();
        for sink in sinks {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| sink.lock().emit(record)));

            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    metrics.record_sink_failure();
                    eprintln!("[LOGGER ERROR] Sink '{}' failed: {}", sink.lock().name(), e);
                }
                Err(panic_info) => {
                    metrics.record_sink_failure();
                    eprintln!(
                        "[LOGGER CRITICAL] Sink '{}' panicked: {}. Other sinks continue to function.",
                        sink.lock().name(),
                        hooks::panic_message(&*panic_info)
                    );
                }
            }
        }
    }
}

/// Builder for [`BootstrapController`]
///
/// # Example
/// ```
/// use bootlog::prelude::*;
/// use std::sync::Arc;
///
/// let temp = tempfile::TempDir::new().unwrap();
/// let controller = BootstrapController::builder()
///     .buffer_capacity(500)
///     .stderr_level(Level::ERROR)
///     .temp_dir(temp.path())
///     .install_panic_hook(false)
///     .on_overflow(Arc::new(|count: u64| {
///         eprintln!("ALERT: {} startup records dropped", count);
///     }))
///     .build()
///     .unwrap();
/// assert!(!controller.is_configured());
/// ```
pub struct ControllerBuilder {
    buffer_capacity: usize,
    stderr_level: Level,
    temp_dir: Option<PathBuf>,
    stderr_writer: Option<Box<dyn Write + Send>>,
    log_file_name: String,
    hostname: Option<String>,
    extra: LogContext,
    overflow_policy: OverflowPolicy,
    on_overflow: Option<OverflowCallback>,
    install_panic_hook: bool,
    sanitize_messages: bool,
    interactive_shell: Option<Arc<HookChain<ErrorReport>>>,
    registry: Option<Arc<SeverityRegistry>>,
}

impl ControllerBuilder {
    pub fn new() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            stderr_level: DEFAULT_STDERR_LEVEL,
            temp_dir: None,
            stderr_writer: None,
            log_file_name: DEFAULT_LOG_FILE_NAME.to_string(),
            hostname: None,
            extra: LogContext::new(),
            overflow_policy: OverflowPolicy::default(),
            on_overflow: None,
            install_panic_hook: true,
            sanitize_messages: false,
            interactive_shell: None,
            registry: None,
        }
    }

    /// Records each bootstrap buffer holds before overflowing
    #[must_use = "builder methods return a new value"]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Threshold of the stderr sink until `configure`
    #[must_use = "builder methods return a new value"]
    pub fn stderr_level(mut self, level: Level) -> Self {
        self.stderr_level = level;
        self
    }

    /// Directory for the bootstrap temp file
    #[must_use = "builder methods return a new value"]
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Writer used in place of the process stderr
    #[must_use = "builder methods return a new value"]
    pub fn stderr_writer(mut self, writer: Box<dyn Write + Send>) -> Self {
        self.stderr_writer = Some(writer);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn log_file_name(mut self, name: impl Into<String>) -> Self {
        self.log_file_name = name.into();
        self
    }

    /// Value of the `hostname` field instead of the system node name
    #[must_use = "builder methods return a new value"]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Extra field merged into every record and usable in format templates
    #[must_use = "builder methods return a new value"]
    pub fn extra_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.extra.add_field(key, value);
        self
    }

    /// What a full bootstrap buffer drops while unconfigured
    #[must_use = "builder methods return a new value"]
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Called with the running count of startup records dropped
    ///
    /// Both bootstrap buffers hold the same records, so drops are counted
    /// once, from the buffer that mirrors the log file.
    #[must_use = "builder methods return a new value"]
    pub fn on_overflow(mut self, callback: OverflowCallback) -> Self {
        self.on_overflow = Some(callback);
        self
    }

    /// Whether `build` installs the process panic hook (default true)
    #[must_use = "builder methods return a new value"]
    pub fn install_panic_hook(mut self, install: bool) -> Self {
        self.install_panic_hook = install;
        self
    }

    /// Escape newlines, carriage returns and tabs in messages (default false)
    ///
    /// Keeps every record on one line for consumers that split on newlines.
    #[must_use = "builder methods return a new value"]
    pub fn sanitize_messages(mut self, sanitize: bool) -> Self {
        self.sanitize_messages = sanitize;
        self
    }

    /// Traceback chain of an interactive host to log through
    #[must_use = "builder methods return a new value"]
    pub fn interactive_shell(mut self, chain: Arc<HookChain<ErrorReport>>) -> Self {
        self.interactive_shell = Some(chain);
        self
    }

    /// Share a registry with custom level names
    #[must_use = "builder methods return a new value"]
    pub fn registry(mut self, registry: Arc<SeverityRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Create the bootstrap sinks and install the exception hooks
    pub fn build(self) -> Result<Arc<BootstrapController>> {
        let metrics = Arc::new(LoggerMetrics::new());

        let temp_file = match self.temp_dir {
            Some(ref dir) => TempFileSink::create_in(dir)?,
            None => TempFileSink::create()?,
        };
        let temp_file_path = temp_file.path().to_path_buf();

        let stderr = match self.stderr_writer {
            Some(writer) => StreamSink::console(writer, self.stderr_level, Formatter::bootstrap()),
            None => StreamSink::stderr(self.stderr_level, Formatter::bootstrap()),
        };

        let on_overflow: OverflowCallback = {
            let metrics = Arc::clone(&metrics);
            let user = self.on_overflow;
            Arc::new(move |count: u64| {
                metrics.record_buffer_dropped();
                if let Some(ref callback) = user {
                    callback(count);
                }
            })
        };
        let buffer = |name: &str| {
            BufferSink::new(name, self.buffer_capacity).with_overflow_policy(self.overflow_policy)
        };

        let bootstrap = BootstrapSinks {
            temp_file: shared(temp_file),
            stderr_buffer: shared(buffer("stderr_buffer")),
            file_buffer: shared(buffer("file_buffer").on_overflow(on_overflow)),
        };
        let stderr = shared(stderr);
        let sinks: Vec<SharedSink> = vec![
            bootstrap.temp_file.clone() as SharedSink,
            stderr.clone() as SharedSink,
            bootstrap.stderr_buffer.clone() as SharedSink,
            bootstrap.file_buffer.clone() as SharedSink,
        ];

        let mut extra = LogContext::new().with_field("hostname", self.hostname.unwrap_or_else(node_name));
        extra.merge(&self.extra);

        let controller = Arc::new(BootstrapController {
            registry: self.registry.unwrap_or_default(),
            resolver: CallerResolver::new(),
            extra,
            stderr,
            live: RwLock::new(LiveSinks {
                state: ControllerState::Unconfigured,
                sinks,
                bootstrap: Some(bootstrap),
                file: None,
            }),
            effective_level: AtomicU32::new(Level::NOTSET.rank()),
            sanitize_messages: self.sanitize_messages,
            log_file_name: self.log_file_name,
            temp_file_path,
            metrics,
        });

        if self.install_panic_hook {
            hooks::install_panic_hook(&controller);
        }
        if let Some(ref shell) = self.interactive_shell {
            hooks::install_traceback_hook(&controller, shell);
        }
        Ok(controller)
    }
}

impl Default for ControllerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn node_name() -> String {
    rustix::system::uname().nodename().to_string_lossy().into_owned()
}

#[cfg(not(unix))]
fn node_name() -> String {
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "localhost".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io;
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl Capture {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn controller(temp: &TempDir, stderr: &Capture) -> Arc<BootstrapController> {
        BootstrapController::builder()
            .temp_dir(temp.path())
            .stderr_writer(Box::new(stderr.clone()))
            .hostname("testhost")
            .install_panic_hook(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_bootstrap_sink_set() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let controller = controller(&temp, &Capture::default());

        assert_eq!(controller.state(), ControllerState::Unconfigured);
        assert_eq!(
            controller.sink_names(),
            ["temp_file", "stderr", "stderr_buffer", "file_buffer"]
        );
        assert_eq!(controller.effective_level(), Level::NOTSET);
        assert!(controller.temp_file_path().exists());
        assert!(controller.log_file_path().is_none());
        assert_eq!(
            controller.extra().get("hostname"),
            Some(&FieldValue::String("testhost".to_string()))
        );
    }

    #[test]
    fn test_configure_swaps_sinks() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let out = temp.path().join("logs");
        let controller = controller(&temp, &Capture::default());

        controller
            .configure(&LoggingConfig::new(&out).with_level("INFO"))
            .unwrap();

        assert!(controller.is_configured());
        assert_eq!(controller.sink_names(), ["stderr", "file"]);
        assert_eq!(controller.effective_level(), Level::INFO);
        assert_eq!(controller.log_file_path(), Some(out.join(DEFAULT_LOG_FILE_NAME)));
        assert!(!controller.temp_file_path().exists());
    }

    #[test]
    fn test_settings_summary_goes_to_file_only() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let stderr = Capture::default();
        let controller = controller(&temp, &stderr);

        let config = LoggingConfig::new(temp.path()).with_level(Level::DEBUG1);
        controller.configure(&config).unwrap();

        let content = fs::read_to_string(temp.path().join(DEFAULT_LOG_FILE_NAME)).unwrap();
        assert!(content.contains("(testhost): DEBUG1 - Settings: {"));
        assert!(!stderr.text().contains("Settings:"));
    }

    #[test]
    fn test_failed_configure_keeps_bootstrap() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let controller = controller(&temp, &Capture::default());

        let err = controller
            .configure(&LoggingConfig::new(temp.path()).with_level("LOUD"))
            .unwrap_err();
        assert!(matches!(err, LoggerError::UnknownLevel { .. }));

        let err = controller
            .configure(&LoggingConfig::new(temp.path()).with_format("%(nosuchfield)s", crate::FormatStyle::Percent))
            .unwrap_err();
        assert!(matches!(err, LoggerError::FormatterError { .. }));

        assert!(!controller.is_configured());
        assert_eq!(controller.sink_names().len(), 4);
        assert!(controller.temp_file_path().exists());
        assert!(!temp.path().join(DEFAULT_LOG_FILE_NAME).exists());
    }

    #[test]
    fn test_second_configure_reports_on_stderr() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let stderr = Capture::default();
        let controller = controller(&temp, &stderr);
        let config = LoggingConfig::new(temp.path());

        controller.configure(&config).unwrap();
        let before = fs::read_to_string(temp.path().join(DEFAULT_LOG_FILE_NAME)).unwrap();

        let err = controller.configure(&config).unwrap_err();
        assert!(err.is_already_configured());
        assert!(stderr.text().contains("Configure logger called twice, this is unexpected"));

        let after = fs::read_to_string(temp.path().join(DEFAULT_LOG_FILE_NAME)).unwrap();
        assert_eq!(before, after);
    }

    struct Panicking;

    impl Sink for Panicking {
        fn threshold(&self) -> Level {
            Level::NOTSET
        }
        fn set_threshold(&mut self, _level: Level) {}
        fn set_formatter(&mut self, _formatter: Formatter) {}
        fn write(&mut self, _record: &LogRecord) -> Result<()> {
            panic!("sink exploded");
        }
        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
        fn name(&self) -> &str {
            "panicking"
        }
    }

    #[test]
    fn test_panicking_sink_is_isolated() {
        let metrics = LoggerMetrics::new();
        let capture = Capture::default();
        let good: SharedSink = shared(StreamSink::new(
            "mem",
            Box::new(capture.clone()),
            Level::NOTSET,
            Formatter::bootstrap(),
        ));
        let bad: SharedSink = shared(Panicking);
        let record = LogRecord::new("t", Level::ERROR, "ERROR", "still delivered");

        BootstrapController::emit_to(&[bad, good], &record, &metrics);

        assert!(capture.text().contains("still delivered"));
        assert_eq!(metrics.sink_failures(), 1);
        assert_eq!(metrics.dispatched(), 1);
    }

    #[test]
    fn test_sink_scope_restores() {
        let a: SharedSink = shared(BufferSink::new("a", 1));
        let b: SharedSink = shared(BufferSink::new("b", 1));
        let mut sinks = vec![a.clone(), b.clone()];
        {
            let scope = SinkScope::new(&mut sinks, vec![b.clone()]);
            assert_eq!(scope.sinks().len(), 1);
        }
        assert_eq!(sinks.len(), 2);
        assert!(Arc::ptr_eq(&sinks[0], &a));
    }

    struct Exploding;

    impl Write for Exploding {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            panic!("terminal gone");
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_panicking_sink_during_replay_still_configures() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let controller = BootstrapController::builder()
            .temp_dir(temp.path())
            .stderr_writer(Box::new(Exploding))
            .install_panic_hook(false)
            .build()
            .unwrap();
        let log = controller.get_logger("boot");
        log.warning("first");
        log.error("second");

        let config = LoggingConfig::new(temp.path())
            .with_level("WARNING")
            .with_format("%(message)s", crate::FormatStyle::Percent);
        controller.configure(&config).unwrap();

        assert!(controller.is_configured());
        let content = fs::read_to_string(temp.path().join(DEFAULT_LOG_FILE_NAME)).unwrap();
        let lines: Vec<_> = content.lines().filter(|l| !l.starts_with("Settings:")).collect();
        assert_eq!(lines, ["first", "second"]);
        // two failed live writes before configure, two failed replays
        assert_eq!(controller.metrics().sink_failures(), 4);
        assert_eq!(controller.metrics().replayed(), 2);

        assert!(controller.configure(&config).unwrap_err().is_already_configured());
    }

    #[test]
    fn test_dropped_startup_records_counted_once() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = Arc::clone(&calls);
        let controller = BootstrapController::builder()
            .temp_dir(temp.path())
            .stderr_writer(Box::new(io::sink()))
            .buffer_capacity(2)
            .on_overflow(Arc::new(move |count: u64| calls_clone.lock().push(count)))
            .install_panic_hook(false)
            .build()
            .unwrap();

        let log = controller.get_logger("boot");
        for i in 0..5 {
            log.info(format!("m{}", i));
        }

        assert_eq!(controller.metrics().buffer_dropped(), 3);
        assert_eq!(*calls.lock(), [1, 2, 3]);
    }

    #[test]
    fn test_sanitize_messages_is_opt_in() {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let plain = controller(&temp, &Capture::default());
        assert_eq!(plain.make_record("app", Level::INFO, "a\nb").message, "a\nb");

        let strict = BootstrapController::builder()
            .temp_dir(temp.path())
            .stderr_writer(Box::new(io::sink()))
            .sanitize_messages(true)
            .install_panic_hook(false)
            .build()
            .unwrap();
        assert_eq!(strict.make_record("app", Level::INFO, "a\nb\tc").message, "a\\nb\\tc");
    }
}
