//! Logging configuration supplied once the host's settings have loaded

use super::error::Result;
use super::formatter::FormatStyle;
use super::level::LevelSpec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LEVEL: &str = "ERROR";
pub const DEFAULT_FORMAT: &str = "%(asctime)s (%(hostname)s): %(levelname)s - %(message)s";

/// Final logging behavior, handed to `BootstrapController::configure`
///
/// # Example
///
/// ```
/// use bootlog::{FormatStyle, LoggingConfig};
///
/// let config = LoggingConfig::from_json_str(
///     r#"{"level": "debug2", "format": "{levelname} {message}", "style": "{", "outputDirectory": "/tmp/run"}"#,
/// ).unwrap();
/// assert_eq!(config.style, FormatStyle::Brace);
/// assert!(config.date_format.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: LevelSpec,
    pub format: String,
    #[serde(default, alias = "dateFormat")]
    pub date_format: Option<String>,
    #[serde(default)]
    pub style: FormatStyle,
    #[serde(alias = "outputDirectory")]
    pub output_directory: PathBuf,
}

impl LoggingConfig {
    /// Defaults for everything except where the log file goes
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            level: LevelSpec::ByName(DEFAULT_LEVEL.to_string()),
            format: DEFAULT_FORMAT.to_string(),
            date_format: None,
            style: FormatStyle::Percent,
            output_directory: output_directory.into(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_level(mut self, level: impl Into<LevelSpec>) -> Self {
        self.level = level.into();
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>, style: FormatStyle) -> Self {
        self.format = format.into();
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = Some(date_format.into());
        self
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::new("/tmp/run");
        assert_eq!(config.level, LevelSpec::ByName("ERROR".to_string()));
        assert_eq!(config.format, DEFAULT_FORMAT);
        assert_eq!(config.style, FormatStyle::Percent);
        assert_eq!(config.output_directory(), Path::new("/tmp/run"));
    }

    #[test]
    fn test_json_snake_case_with_numeric_level() {
        let config = LoggingConfig::from_json_str(
            r#"{"level": 9, "format": "%(message)s", "date_format": "%H:%M", "output_directory": "out"}"#,
        )
        .unwrap();
        assert_eq!(config.level, LevelSpec::ByRank(9));
        assert_eq!(config.date_format.as_deref(), Some("%H:%M"));
        assert_eq!(config.style, FormatStyle::Percent);
    }

    #[test]
    fn test_json_missing_field() {
        let err = LoggingConfig::from_json_str(r#"{"level": "INFO", "format": "%(message)s"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("output_directory"));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = LoggingConfig::new("out")
            .with_level("info")
            .with_format("$message", FormatStyle::Dollar)
            .with_date_format("%Y");
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(LoggingConfig::from_json_str(&json).unwrap(), config);
    }
}
