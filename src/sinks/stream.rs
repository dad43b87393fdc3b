//! Stream sink: stderr or an append-mode log file

use crate::core::{Formatter, Level, LogRecord, LoggerError, Result, Sink};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct StreamSink {
    name: String,
    writer: Box<dyn Write + Send>,
    threshold: Level,
    formatter: Formatter,
    path: Option<PathBuf>,
    /// Swallow every write error (stderr)
    best_effort: bool,
    /// A write error was already surfaced once
    failed: bool,
}

impl StreamSink {
    /// Sink over an arbitrary writer; write errors are surfaced once
    pub fn new(
        name: impl Into<String>,
        writer: Box<dyn Write + Send>,
        threshold: Level,
        formatter: Formatter,
    ) -> Self {
        Self {
            name: name.into(),
            writer,
            threshold,
            formatter,
            path: None,
            best_effort: false,
            failed: false,
        }
    }

    /// Best-effort sink on the process stderr
    pub fn stderr(threshold: Level, formatter: Formatter) -> Self {
        Self::console(Box::new(io::stderr()), threshold, formatter)
    }

    /// Best-effort console sink over `writer`, which stands in for stderr
    pub fn console(writer: Box<dyn Write + Send>, threshold: Level, formatter: Formatter) -> Self {
        let mut sink = Self::new("stderr", writer, threshold, formatter);
        sink.best_effort = true;
        sink
    }

    /// Open `path` for appending, creating missing parent directories
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use bootlog::sinks::StreamSink;
    /// use bootlog::{Formatter, Level};
    ///
    /// let sink = StreamSink::append_file("/var/log/app/run.log", Level::INFO, Formatter::bootstrap())
    ///     .unwrap();
    /// ```
    pub fn append_file(path: impl AsRef<Path>, threshold: Level, formatter: Formatter) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation("creating log directory", parent.display().to_string(), e)
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| LoggerError::io_operation("opening log file", path.display().to_string(), e))?;

        let mut sink = Self::new("file", Box::new(file), threshold, formatter);
        sink.path = Some(path.to_path_buf());
        Ok(sink)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl Sink for StreamSink {
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
        let line = self.formatter.format(record);
        match self.write_line(&line) {
            Ok(()) => Ok(()),
            Err(_) if self.best_effort || self.failed => Ok(()),
            Err(e) => {
                self.failed = true;
                let target = self
                    .path
                    .as_ref()
                    .map_or_else(|| self.name.clone(), |p| p.display().to_string());
                Err(LoggerError::io_operation("writing log record", target, e))
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.writer.flush() {
            Err(_) if self.best_effort => Ok(()),
            other => Ok(other?),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for StreamSink {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}
