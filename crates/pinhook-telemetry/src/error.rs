//! Logging setup errors.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from building or installing the log subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level, directive or format string did not parse.
    #[error("invalid log setting: {0}")]
    InvalidSetting(String),

    /// The directory for file logging could not be created.
    #[error("cannot create log directory {}: {source}", path.display())]
    LogDirectory {
        /// Directory that was requested.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// A global subscriber is already installed.
    #[error("cannot install log subscriber: {0}")]
    Install(String),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
