//! Logging configuration and setup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self as tfmt, MakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Environment variable that overrides the configured level and directives.
pub const LOG_ENV_VAR: &str = "PINHOOK_LOG";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

fn init_err<E: fmt::Display>(e: E) -> TelemetryError {
    TelemetryError::Install(e.to_string())
}

/// Log format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable format.
    Pretty,
    /// Compact single-line format (default).
    #[default]
    Compact,
    /// JSON format for structured logging.
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TelemetryError::InvalidSetting(format!(
                "unknown log format '{other}'; expected pretty, compact or json"
            ))),
        }
    }
}

/// Log output target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    /// Log to stderr. Stdout is reserved for the hook report.
    #[default]
    Stderr,
    /// Log to a file that is never rotated.
    File {
        /// Directory holding the log file.
        dir: PathBuf,
        /// File name inside `dir`.
        name: String,
    },
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    #[serde(default = "default_level")]
    pub level: String,
    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
    /// Log target.
    #[serde(default)]
    pub target: LogTarget,
    /// Whether to use ANSI colors.
    #[serde(default = "default_true")]
    pub ansi: bool,
    /// Whether to include timestamps.
    #[serde(default = "default_true")]
    pub timestamps: bool,
    /// Directive overrides (e.g., `pinhook_hooks=debug`).
    #[serde(default)]
    pub directives: Vec<String>,
}

fn default_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            ansi: true,
            timestamps: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Create a new log config with the specified level.
    #[must_use]
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// Pick a level from a `-v` count: 0 keeps `base`, 1 is debug, 2+ is trace.
    #[must_use]
    pub fn from_verbosity(base: impl Into<String>, verbose: u8) -> Self {
        let level = match verbose {
            0 => base.into(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        };
        Self::new(level)
    }

    /// Set the log format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Log to `dir/name` instead of stderr. Disables ANSI colors.
    #[must_use]
    pub fn with_file(mut self, dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        self.target = LogTarget::File {
            dir: dir.into(),
            name: name.into(),
        };
        self.ansi = false;
        self
    }

    /// Add a directive override.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.directives.push(directive.into());
        self
    }

    /// Disable timestamps.
    #[must_use]
    pub fn without_timestamps(mut self) -> Self {
        self.timestamps = false;
        self
    }

    /// Disable ANSI colors.
    #[must_use]
    pub fn without_ansi(mut self) -> Self {
        self.ansi = false;
        self
    }

    /// Build the env filter. `PINHOOK_LOG`, when set, wins over `level`.
    fn build_filter(&self) -> TelemetryResult<EnvFilter> {
        let base = std::env::var(LOG_ENV_VAR).unwrap_or_else(|_| self.level.clone());
        let mut filter =
            EnvFilter::try_new(&base).map_err(|e| TelemetryError::InvalidSetting(e.to_string()))?;

        for directive in &self.directives {
            filter = filter.add_directive(directive.parse().map_err(
                |e: tracing_subscriber::filter::ParseError| {
                    TelemetryError::InvalidSetting(e.to_string())
                },
            )?);
        }

        Ok(filter)
    }

    fn layer<W>(&self, writer: W) -> BoxedLayer
    where
        W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
    {
        let base = tfmt::layer().with_writer(writer).with_target(true);
        match (self.format, self.timestamps) {
            (LogFormat::Json, true) => base.json().boxed(),
            (LogFormat::Json, false) => base.json().without_time().boxed(),
            (LogFormat::Pretty, true) => base.pretty().with_ansi(self.ansi).boxed(),
            (LogFormat::Pretty, false) => {
                base.pretty().with_ansi(self.ansi).without_time().boxed()
            },
            (LogFormat::Compact, true) => base.compact().with_ansi(self.ansi).boxed(),
            (LogFormat::Compact, false) => {
                base.compact().with_ansi(self.ansi).without_time().boxed()
            },
        }
    }
}

/// Set up logging with the given configuration.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the log directory cannot
/// be created, or a global subscriber is already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = config.build_filter()?;

    let layer = match &config.target {
        LogTarget::Stderr => config.layer(std::io::stderr),
        LogTarget::File { dir, name } => {
            std::fs::create_dir_all(dir).map_err(|source| TelemetryError::LogDirectory {
                path: dir.clone(),
                source,
            })?;
            config.layer(RollingFileAppender::new(Rotation::NEVER, dir, name))
        },
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()
        .map_err(init_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, "warn");
        assert_eq!(config.format, LogFormat::Compact);
        assert_eq!(config.target, LogTarget::Stderr);
        assert!(config.ansi);
    }

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LogConfig::from_verbosity("warn", 0).level, "warn");
        assert_eq!(LogConfig::from_verbosity("warn", 1).level, "debug");
        assert_eq!(LogConfig::from_verbosity("warn", 5).level, "trace");
    }

    #[test]
    fn test_log_config_builder() {
        let config = LogConfig::new("debug")
            .with_format(LogFormat::Json)
            .without_timestamps()
            .with_directive("pinhook_hooks=trace");

        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.timestamps);
        assert_eq!(config.directives, vec!["pinhook_hooks=trace"]);
    }

    #[test]
    fn test_with_file_disables_ansi() {
        let dir = tempfile::tempdir().unwrap();
        let config = LogConfig::default().with_file(dir.path(), "pinhook.log");
        assert!(!config.ansi);
        assert!(matches!(config.target, LogTarget::File { .. }));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_log_config_serialization() {
        let config = LogConfig::new("info").with_format(LogFormat::Pretty);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"level\":\"info\""));
        assert!(json.contains("\"format\":\"pretty\""));

        let parsed: LogConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.format, LogFormat::Pretty);
    }

    #[test]
    fn test_build_filter_invalid_directive() {
        let config = LogConfig::new("debug").with_directive("[invalid=syntax");
        assert!(matches!(
            config.build_filter(),
            Err(TelemetryError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_unwritable_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let config = LogConfig::default().with_file(blocker.join("logs"), "pinhook.log");
        let err = setup_logging(&config).unwrap_err();
        assert!(
            matches!(&err, TelemetryError::LogDirectory { path, .. } if path.ends_with("logs")),
            "{err}"
        );
    }
}
