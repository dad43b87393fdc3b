//! Always-on bootstrap file in the platform temp directory
//!
//! Captures every record from process start until configuration. The file is
//! deliberately kept on disk: if the process dies before `configure`, it is
//! the only trace of what happened. `configure` deletes it.

use super::stream::StreamSink;
use crate::core::{Formatter, Level, LogRecord, LoggerError, Result, Sink};
use std::fs;
use std::path::{Path, PathBuf};

pub const TEMP_FILE_PREFIX: &str = "bootlog_initial_tmp_";

pub struct TempFileSink {
    inner: Option<StreamSink>,
    path: PathBuf,
}

impl TempFileSink {
    /// Create a uniquely named file in the platform temp directory
    pub fn create() -> Result<Self> {
        Self::create_in(std::env::temp_dir())
    }

    /// Create a uniquely named file in `dir`
    pub fn create_in(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let named = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(dir)
            .map_err(|e| {
                LoggerError::io_operation("creating bootstrap temp file", dir.display().to_string(), e)
            })?;
        let (file, path) = named.keep().map_err(|e| {
            LoggerError::io_operation("keeping bootstrap temp file", dir.display().to_string(), e.error)
        })?;

        let inner = StreamSink::new("temp_file", Box::new(file), Level::NOTSET, Formatter::bootstrap());
        Ok(Self {
            inner: Some(inner),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the file and delete it
    pub fn remove(&mut self) -> Result<()> {
        if let Some(mut inner) = self.inner.take() {
            let _ = inner.flush();
        }
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LoggerError::io_operation(
                "removing bootstrap temp file",
                self.path.display().to_string(),
                e,
            )),
        }
    }
}

impl Sink for TempFileSink {
    fn threshold(&self) -> Level {
        self.inner.as_ref().map_or(Level::NOTSET, |inner| inner.threshold())
    }

    fn set_threshold(&mut self, level: Level) {
        if let Some(ref mut inner) = self.inner {
            inner.set_threshold(level);
        }
    }

    fn set_formatter(&mut self, formatter: Formatter) {
        if let Some(ref mut inner) = self.inner {
            inner.set_formatter(formatter);
        }
    }

    fn write(&mut self, record: &LogRecord) -> Result<()> {
        match self.inner {
            Some(ref mut inner) => inner.write(record),
            None => Ok(()),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self.inner {
            Some(ref mut inner) => inner.flush(),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "temp_file"
    }
}
